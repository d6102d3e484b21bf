use serde::{Deserialize, Serialize};

use super::catalog::ClassCatalog;

/// Detector output before normalization: float xyxy box in source pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: i64,
}

impl RawDetection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &RawDetection) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = w * h;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Converts raw detector output into wire records.
///
/// Confidence is clamped to `[0, 1]` and rounded to 4 decimals, coordinates
/// are truncated toward zero and ordered so that `x1 <= x2`, `y1 <= y2`.
pub fn normalize(raw: &[RawDetection], catalog: &ClassCatalog) -> Vec<Detection> {
    raw.iter()
        .map(|r| {
            let (x1, x2) = ordered(r.x1 as i32, r.x2 as i32);
            let (y1, y2) = ordered(r.y1 as i32, r.y2 as i32);
            Detection {
                class_name: catalog.name_for(r.class_id),
                confidence: round_confidence(r.confidence),
                bbox: BoundingBox { x1, y1, x2, y2 },
            }
        })
        .collect()
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn round_confidence(confidence: f32) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    let clamped = (confidence as f64).clamp(0.0, 1.0);
    (clamped * 10_000.0).round() / 10_000.0
}
