use image::RgbImage;
use serde::Serialize;
use std::path::Path;

use crate::domain::{
    catalog::ClassCatalog,
    detection::RawDetection,
    errors::DomainResult,
    model::InferenceParams,
};

/// Object detector loaded once at startup and shared by every request.
///
/// Implementations are called from the blocking pool, possibly from several
/// requests at once. Failures must be reported as `DomainError::Inference`.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;
    fn class_catalog(&self) -> &ClassCatalog;
    fn infer(&self, image: &RgbImage, params: &InferenceParams) -> DomainResult<Vec<RawDetection>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VideoInfo {
    pub frame_count: Option<u64>,
    pub fps: Option<f64>,
}

/// Sequential, non-restartable frame reader. Dropping it releases the handle.
///
/// A source lives and dies on the blocking thread that opened it.
pub trait VideoSource {
    fn info(&self) -> VideoInfo {
        VideoInfo::default()
    }

    /// `Ok(None)` at end of stream, `DomainError::Decode` when a frame cannot be read.
    fn next_frame(&mut self) -> DomainResult<Option<RgbImage>>;

    /// Advances past one frame without handing it out. Returns `false` at end of stream.
    fn skip_frame(&mut self) -> DomainResult<bool> {
        Ok(self.next_frame()?.is_some())
    }
}

pub trait VideoOpener: Send + Sync {
    /// Fails with `DomainError::SourceUnavailable` when the file cannot be decoded.
    fn open(&self, path: &Path) -> DomainResult<Box<dyn VideoSource>>;
}
