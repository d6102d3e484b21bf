use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::{Detection, FrameResult},
    summary::DetectionStats,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePredictionResponse {
    pub filename: String,
    pub inference_time_ms: u64,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoPredictionResponse {
    pub frames_processed: u64,
    pub inference_time_ms: u64,
    pub summary: Vec<FrameResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledScore {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysis {
    pub original_size: Size,
    pub display_size: Size,
    pub resized: bool,
    /// Base64 PNG of the displayed (possibly downsized) image.
    pub original_png: String,
    /// Same image with detection outlines.
    pub annotated_png: String,
    pub detections: Vec<LabeledScore>,
    pub stats: Option<DetectionStats>,
    pub headline: String,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoAnalysis {
    pub total_frames: Option<u64>,
    pub fps: Option<f64>,
    pub frames_analyzed: u64,
    pub total_detections: usize,
    pub mean_per_frame: f64,
    pub inference_time_ms: u64,
    /// One line per sampled frame, capped.
    pub lines: Vec<String>,
}
