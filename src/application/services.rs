use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::{
    application::{
        dto::{ImageAnalysis, LabeledScore, Size, VideoAnalysis},
        imaging,
        ports::{Detector, VideoInfo, VideoOpener},
        sampler::{FrameSampler, SampledFrame},
    },
    domain::{
        catalog::ClassCatalog,
        detection::{normalize, Detection, FrameResult},
        errors::{DomainError, DomainResult},
        model::{FramePolicy, InferenceParams, SamplingOptions},
        summary::{describe_frame, summarize_detections, DetectionStats},
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePrediction {
    pub inference_time_ms: u64,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoPrediction {
    pub frames_processed: u64,
    pub inference_time_ms: u64,
    pub summary: Vec<FrameResult>,
    pub info: VideoInfo,
}

/// Runs the detector over a persisted upload and assembles the per-request result.
/// Shared by the JSON API and the dashboard.
pub struct AggregationPipeline {
    detector: Arc<dyn Detector>,
    videos: Arc<dyn VideoOpener>,
    frame_policy: FramePolicy,
}

impl AggregationPipeline {
    pub fn new(detector: Arc<dyn Detector>, videos: Arc<dyn VideoOpener>, frame_policy: FramePolicy) -> Self {
        Self { detector, videos, frame_policy }
    }

    pub fn class_catalog(&self) -> &ClassCatalog {
        self.detector.class_catalog()
    }

    /// One detector call on an in-memory frame, normalized.
    pub fn detect_frame(&self, image: &RgbImage, params: &InferenceParams) -> DomainResult<Vec<Detection>> {
        let raw = self.detector.infer(image, params).map_err(|e| match e {
            DomainError::Inference(_) => e,
            other => DomainError::Inference(other.to_string()),
        })?;
        Ok(normalize(&raw, self.detector.class_catalog()))
    }

    /// Image mode. Decoding counts as part of inference: an unreadable file is
    /// an inference failure, as if the detector had been handed it directly.
    pub fn run_image(&self, path: &Path, params: &InferenceParams) -> DomainResult<ImagePrediction> {
        let started = Instant::now();
        let image = imaging::decode_file(path)
            .map_err(|e| DomainError::Inference(format!("cannot read image: {e}")))?;
        let detections = self.detect_frame(&image, params)?;
        let inference_time_ms = elapsed_ms(started);

        debug!(count = detections.len(), inference_time_ms, "image processed");
        Ok(ImagePrediction { inference_time_ms, detections })
    }

    /// Video mode. Frame results come back in sampling order.
    ///
    /// A frame that cannot be read ends the stream: the frames sampled so far
    /// are returned and the failure is only logged.
    pub fn run_video(
        &self,
        path: &Path,
        params: &InferenceParams,
        sampling: &SamplingOptions,
    ) -> DomainResult<VideoPrediction> {
        let source = self.videos.open(path)?;
        let info = source.info();
        let sampler = FrameSampler::new(source, sampling.stride(), sampling.max_frames());

        let started = Instant::now();
        let mut summary = Vec::new();

        for sampled in sampler {
            let SampledFrame { index, image } = match sampled {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(frames = summary.len(), error = %e, "video stream cut short, keeping frames read so far");
                    break;
                }
            };
            let image = match sampling.max_frame_dimensions() {
                Some((w, h)) => imaging::fit_within(image, w, h),
                None => image,
            };

            match self.detect_frame(&image, params) {
                Ok(detections) => summary.push(FrameResult { frame_index: index, detections, error: None }),
                Err(e) if !self.frame_policy.abort_on_frame_error => {
                    warn!(frame_index = index, error = %e, "frame skipped after detector failure");
                    summary.push(FrameResult {
                        frame_index: index,
                        detections: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let inference_time_ms = elapsed_ms(started);
        debug!(frames = summary.len(), inference_time_ms, "video processed");

        Ok(VideoPrediction {
            frames_processed: summary.len() as u64,
            inference_time_ms,
            summary,
            info,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Use cases behind the browser dashboard.
#[derive(Clone)]
pub struct DashboardService {
    pipeline: Arc<AggregationPipeline>,
}

impl DashboardService {
    pub const IMAGE_DISPLAY_BOUNDS: (u32, u32) = (600, 500);
    pub const VIDEO_STRIDE: u64 = 10;
    pub const VIDEO_FRAME_BOUNDS: (u32, u32) = (640, 480);
    pub const SUMMARY_LINES: usize = 50;

    pub fn new(pipeline: Arc<AggregationPipeline>) -> Self {
        Self { pipeline }
    }

    /// Downsizes for display, detects on the displayed image and renders outlines.
    pub fn analyze_image(&self, path: &Path) -> DomainResult<ImageAnalysis> {
        let original = imaging::decode_file(path)
            .map_err(|e| DomainError::Validation(format!("cannot decode image: {e}")))?;
        let original_size = size_of(&original);

        let (max_w, max_h) = Self::IMAGE_DISPLAY_BOUNDS;
        let display = imaging::fit_within(original, max_w, max_h);
        let display_size = size_of(&display);

        let detections = self.pipeline.detect_frame(&display, &InferenceParams::default())?;

        let mut annotated = display.clone();
        imaging::draw_detections(&mut annotated, &detections);

        let stats = DetectionStats::of(&detections);
        let message = stats.is_none().then(|| "no objects detected".to_string());

        Ok(ImageAnalysis {
            original_size,
            display_size,
            resized: original_size != display_size,
            original_png: imaging::png_base64(&display).map_err(encode_error)?,
            annotated_png: imaging::png_base64(&annotated).map_err(encode_error)?,
            headline: summarize_detections(&detections),
            detections: detections
                .into_iter()
                .map(|d| LabeledScore { label: d.class_name, confidence: d.confidence })
                .collect(),
            stats,
            message,
        })
    }

    /// Every tenth frame of the whole video, each downsized before detection.
    pub fn analyze_video(&self, path: &Path) -> DomainResult<VideoAnalysis> {
        let (max_w, max_h) = Self::VIDEO_FRAME_BOUNDS;
        let sampling = SamplingOptions::unbounded(Self::VIDEO_STRIDE)?.with_max_frame_dimensions(max_w, max_h);

        let prediction = self
            .pipeline
            .run_video(path, &InferenceParams::default(), &sampling)?;

        let total_detections: usize = prediction.summary.iter().map(|f| f.detections.len()).sum();
        let mean_per_frame = if prediction.frames_processed == 0 {
            0.0
        } else {
            total_detections as f64 / prediction.frames_processed as f64
        };

        Ok(VideoAnalysis {
            total_frames: prediction.info.frame_count,
            fps: prediction.info.fps,
            frames_analyzed: prediction.frames_processed,
            total_detections,
            mean_per_frame,
            inference_time_ms: prediction.inference_time_ms,
            lines: prediction
                .summary
                .iter()
                .take(Self::SUMMARY_LINES)
                .map(describe_frame)
                .collect(),
        })
    }
}

fn size_of(image: &RgbImage) -> Size {
    Size { width: image.width(), height: image.height() }
}

fn encode_error(e: image::ImageError) -> DomainError {
    DomainError::Inference(format!("cannot encode image: {e}"))
}
