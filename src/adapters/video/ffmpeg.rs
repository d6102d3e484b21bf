//! File-backed video source decoded with FFmpeg.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::path::Path;

use crate::application::ports::{VideoInfo, VideoOpener, VideoSource};
use crate::domain::errors::{DomainError, DomainResult};

pub struct FfmpegVideoOpener;

impl FfmpegVideoOpener {
    pub fn new() -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        Ok(Self)
    }
}

impl VideoOpener for FfmpegVideoOpener {
    fn open(&self, path: &Path) -> DomainResult<Box<dyn VideoSource>> {
        FfmpegVideoSource::open(path)
            .map(|s| Box::new(s) as Box<dyn VideoSource>)
            .map_err(|e| DomainError::SourceUnavailable(format!("{e:#}")))
    }
}

struct FfmpegVideoSource {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    info: VideoInfo,
    eof_sent: bool,
}

impl FfmpegVideoSource {
    fn open(path: &Path) -> Result<Self> {
        let input = ffmpeg::format::input(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = stream.index();

        let frames = stream.frames();
        let rate = stream.avg_frame_rate();
        let info = VideoInfo {
            frame_count: (frames > 0).then_some(frames as u64),
            fps: (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate)),
        };

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context.decoder().video().context("open video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create scaler")?;

        tracing::debug!(path = %path.display(), ?info, "video opened");

        Ok(Self { input, stream_index, decoder, scaler, info, eof_sent: false })
    }

    fn next_decoded(&mut self) -> Result<Option<ffmpeg::frame::Video>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return Ok(Some(decoded));
            }
            if self.eof_sent {
                return Ok(None);
            }
            match read_packet(&mut self.input, self.stream_index) {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .context("send packet to decoder")?,
                None => {
                    self.decoder.send_eof().context("flush decoder")?;
                    self.eof_sent = true;
                }
            }
        }
    }
}

fn read_packet(input: &mut ffmpeg::format::context::Input, stream_index: usize) -> Option<ffmpeg::Packet> {
    input
        .packets()
        .find(|(stream, _)| stream.index() == stream_index)
        .map(|(_, packet)| packet)
}

impl VideoSource for FfmpegVideoSource {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn next_frame(&mut self) -> DomainResult<Option<RgbImage>> {
        let decoded = match self.next_decoded() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(None),
            Err(e) => return Err(DomainError::Decode(format!("{e:#}"))),
        };
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb)
            .map_err(|e| DomainError::Decode(format!("scale frame to RGB: {e}")))?;
        frame_to_image(&rgb)
            .map(Some)
            .map_err(|e| DomainError::Decode(format!("{e:#}")))
    }

    fn skip_frame(&mut self) -> DomainResult<bool> {
        self.next_decoded()
            .map(|f| f.is_some())
            .map_err(|e| DomainError::Decode(format!("{e:#}")))
    }
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(
            data.get(start..start + row_bytes)
                .context("frame row is out of bounds")?,
        );
    }

    RgbImage::from_raw(width, height, pixels).ok_or_else(|| anyhow!("frame buffer size mismatch"))
}
