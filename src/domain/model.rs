use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_INFERENCE_SIZE: u32 = 640;
pub const DEFAULT_FRAME_STRIDE: u64 = 5;
pub const DEFAULT_MAX_FRAMES: u64 = 200;

const INFERENCE_SIZE_RANGE: std::ops::RangeInclusive<u32> = 32..=4096;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub confidence_threshold: f32, // 0..1
    pub inference_size: u32,       // 640 typical
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            inference_size: DEFAULT_INFERENCE_SIZE,
        }
    }
}

impl InferenceParams {
    pub fn new(confidence_threshold: f32, inference_size: u32) -> DomainResult<Self> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(DomainError::Validation(format!(
                "conf must be between 0 and 1, got {confidence_threshold}"
            )));
        }
        if !INFERENCE_SIZE_RANGE.contains(&inference_size) {
            return Err(DomainError::Validation(format!(
                "imgsz must be between {} and {}, got {inference_size}",
                INFERENCE_SIZE_RANGE.start(),
                INFERENCE_SIZE_RANGE.end()
            )));
        }
        Ok(Self { confidence_threshold, inference_size })
    }
}

/// How a video is sampled: every `stride`-th frame, at most `max_frames` of them,
/// optionally downsized to fit `max_frame_dimensions` before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingOptions {
    stride: u64,
    max_frames: u64,
    max_frame_dimensions: Option<(u32, u32)>,
}

impl SamplingOptions {
    pub fn new(stride: i64, max_frames: i64) -> DomainResult<Self> {
        if stride < 1 {
            return Err(DomainError::Validation(format!(
                "frame_stride must be >= 1, got {stride}"
            )));
        }
        if max_frames < 0 {
            return Err(DomainError::Validation(format!(
                "max_frames must be >= 0, got {max_frames}"
            )));
        }
        Ok(Self {
            stride: stride as u64,
            max_frames: max_frames as u64,
            max_frame_dimensions: None,
        })
    }

    /// Every `stride`-th frame with no cap on the count.
    pub fn unbounded(stride: u64) -> DomainResult<Self> {
        if stride == 0 {
            return Err(DomainError::Validation("frame_stride must be >= 1, got 0".into()));
        }
        Ok(Self { stride, max_frames: u64::MAX, max_frame_dimensions: None })
    }

    pub fn with_max_frame_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_frame_dimensions = Some((width, height));
        self
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }

    pub fn max_frame_dimensions(&self) -> Option<(u32, u32)> {
        self.max_frame_dimensions
    }
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            stride: DEFAULT_FRAME_STRIDE,
            max_frames: DEFAULT_MAX_FRAMES,
            max_frame_dimensions: None,
        }
    }
}

/// What a video request does when the detector fails on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePolicy {
    pub abort_on_frame_error: bool,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self { abort_on_frame_error: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_must_be_positive() {
        assert!(matches!(SamplingOptions::new(0, 10), Err(DomainError::Validation(_))));
        assert!(matches!(SamplingOptions::new(-3, 10), Err(DomainError::Validation(_))));
        assert!(matches!(SamplingOptions::unbounded(0), Err(DomainError::Validation(_))));
        assert_eq!(SamplingOptions::new(1, 10).unwrap().stride(), 1);
    }

    #[test]
    fn zero_max_frames_is_allowed_but_negative_is_not() {
        assert_eq!(SamplingOptions::new(5, 0).unwrap().max_frames(), 0);
        assert!(SamplingOptions::new(5, -1).is_err());
    }

    #[test]
    fn inference_params_are_range_checked() {
        assert!(InferenceParams::new(0.25, 640).is_ok());
        assert!(InferenceParams::new(1.5, 640).is_err());
        assert!(InferenceParams::new(f32::NAN, 640).is_err());
        assert!(InferenceParams::new(0.5, 0).is_err());
    }

    #[test]
    fn defaults_match_the_api_contract() {
        let params = InferenceParams::default();
        assert_eq!(params.confidence_threshold, 0.25);
        assert_eq!(params.inference_size, 640);
        let sampling = SamplingOptions::default();
        assert_eq!((sampling.stride(), sampling.max_frames()), (5, 200));
        assert!(FramePolicy::default().abort_on_frame_error);
    }
}
