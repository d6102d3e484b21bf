use serde::Serialize;
use std::collections::BTreeMap;

use super::detection::{Detection, FrameResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStats {
    pub count: usize,
    pub mean_confidence: f64,
}

impl DetectionStats {
    /// `None` when nothing was detected, so callers can tell "no objects" apart.
    pub fn of(detections: &[Detection]) -> Option<Self> {
        if detections.is_empty() {
            return None;
        }
        let total: f64 = detections.iter().map(|d| d.confidence).sum();
        Some(Self {
            count: detections.len(),
            mean_confidence: total / detections.len() as f64,
        })
    }
}

/// "2 bin, 1 bag" style headline, labels in alphabetical order.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.class_name.as_str()).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn describe_frame(frame: &FrameResult) -> String {
    if let Some(err) = &frame.error {
        return format!("Frame {}: failed ({})", frame.frame_index, err);
    }
    if frame.detections.is_empty() {
        return format!("Frame {}: no detections", frame.frame_index);
    }
    let items = frame
        .detections
        .iter()
        .map(|d| format!("{} ({:.2})", d.class_name, d.confidence))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Frame {}: {}", frame.frame_index, items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::detection::BoundingBox;

    fn det(label: &str, confidence: f64) -> Detection {
        Detection {
            class_name: label.into(),
            confidence,
            bbox: BoundingBox { x1: 0, y1: 0, x2: 1, y2: 1 },
        }
    }

    #[test]
    fn stats_absent_without_detections() {
        assert_eq!(DetectionStats::of(&[]), None);
        let stats = DetectionStats::of(&[det("bin", 0.5), det("bin", 1.0)]).unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean_confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn headline_counts_per_label() {
        let dets = [det("bin", 0.5), det("bag", 0.4), det("bin", 0.9)];
        assert_eq!(summarize_detections(&dets), "1 bag, 2 bin");
    }

    #[test]
    fn frame_lines() {
        let empty = FrameResult { frame_index: 20, detections: vec![], error: None };
        assert_eq!(describe_frame(&empty), "Frame 20: no detections");

        let full = FrameResult {
            frame_index: 10,
            detections: vec![det("bin", 0.912), det("bin", 0.4)],
            error: None,
        };
        assert_eq!(describe_frame(&full), "Frame 10: bin (0.91), bin (0.40)");
    }
}
