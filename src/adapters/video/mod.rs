#[cfg(feature = "video-ffmpeg")]
pub mod ffmpeg;

use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{VideoOpener, VideoSource};
use crate::domain::errors::{DomainError, DomainResult};

/// Opener used when the binary is built without a video decoder.
pub struct UnsupportedVideoOpener;

impl VideoOpener for UnsupportedVideoOpener {
    fn open(&self, path: &Path) -> DomainResult<Box<dyn VideoSource>> {
        Err(DomainError::SourceUnavailable(format!(
            "{}: video decoding requires the video-ffmpeg feature",
            path.display()
        )))
    }
}

/// Best decoder compiled into this build.
pub fn default_opener() -> anyhow::Result<Arc<dyn VideoOpener>> {
    #[cfg(feature = "video-ffmpeg")]
    {
        Ok(Arc::new(ffmpeg::FfmpegVideoOpener::new()?))
    }
    #[cfg(not(feature = "video-ffmpeg"))]
    {
        tracing::warn!("built without video-ffmpeg: video uploads will be rejected");
        Ok(Arc::new(UnsupportedVideoOpener))
    }
}
