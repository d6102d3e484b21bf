use image::RgbImage;
use std::iter::FusedIterator;

use crate::application::ports::VideoSource;
use crate::domain::errors::DomainResult;

#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub index: u64,
    pub image: RgbImage,
}

/// Yields every `stride`-th frame of a source, starting at frame 0, until the
/// source ends or `max_frames` frames have been emitted.
///
/// Owns the source: the underlying handle is released when the sampler is
/// dropped, whichever way the caller leaves the loop.
pub struct FrameSampler {
    source: Box<dyn VideoSource>,
    stride: u64,
    max_frames: u64,
    next_index: u64,
    emitted: u64,
    finished: bool,
}

impl FrameSampler {
    /// `stride` is validated upstream (`SamplingOptions`); 0 is treated as 1.
    pub fn new(source: Box<dyn VideoSource>, stride: u64, max_frames: u64) -> Self {
        Self {
            source,
            stride: stride.max(1),
            max_frames,
            next_index: 0,
            emitted: 0,
            finished: false,
        }
    }

    fn stop<T>(&mut self, item: Option<T>) -> Option<T> {
        self.finished = true;
        item
    }
}

impl Iterator for FrameSampler {
    type Item = DomainResult<SampledFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.emitted >= self.max_frames {
            return self.stop(None);
        }

        loop {
            let index = self.next_index;
            if index % self.stride == 0 {
                return match self.source.next_frame() {
                    Ok(Some(image)) => {
                        self.next_index += 1;
                        self.emitted += 1;
                        Some(Ok(SampledFrame { index, image }))
                    }
                    Ok(None) => self.stop(None),
                    Err(e) => self.stop(Some(Err(e))),
                };
            }

            match self.source.skip_frame() {
                Ok(true) => self.next_index += 1,
                Ok(false) => return self.stop(None),
                Err(e) => return self.stop(Some(Err(e))),
            }
        }
    }
}

impl FusedIterator for FrameSampler {}
