use ndarray::ArrayView2;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::domain::detection::RawDetection;

pub const IOU_THRESHOLD: f32 = 0.45;
pub const MAX_DETECTIONS: usize = 300;

/// Decodes a YOLO head laid out as `[4 + classes, candidates]` (cx, cy, w, h,
/// then one score per class) into boxes in source-image pixels.
///
/// `sx`/`sy` scale from model input space back to the source image.
pub fn decode_candidates(view: ArrayView2<'_, f32>, sx: f32, sy: f32, conf_threshold: f32) -> Vec<RawDetection> {
    let (rows, candidates) = view.dim();
    if rows <= 4 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for i in 0..candidates {
        let best = (4..rows)
            .map(|r| (r - 4, view[[r, i]]))
            .filter(|(_, s)| !s.is_nan())
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let Some((class_id, score)) = best else { continue };
        if score <= conf_threshold {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        out.push(RawDetection {
            x1: (cx - w / 2.0) * sx,
            y1: (cy - h / 2.0) * sy,
            x2: (cx + w / 2.0) * sx,
            y2: (cy + h / 2.0) * sy,
            confidence: score,
            class_id: class_id as i64,
        });
    }
    out
}

/// Per-class non-maximum suppression, then the best `max_detections` overall.
pub fn nms(detections: Vec<RawDetection>, iou_threshold: f32, max_detections: usize) -> Vec<RawDetection> {
    let mut by_class: BTreeMap<i64, Vec<RawDetection>> = BTreeMap::new();
    for det in detections {
        by_class.entry(det.class_id).or_default().push(det);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(by_confidence_desc);
        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].iou(&group[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
            kept.push(group[i].clone());
        }
    }

    kept.sort_by(by_confidence_desc);
    kept.truncate(max_detections);
    kept
}

fn by_confidence_desc(a: &RawDetection, b: &RawDetection) -> Ordering {
    b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn det(x1: f32, confidence: f32, class_id: i64) -> RawDetection {
        RawDetection { x1, y1: 0.0, x2: x1 + 10.0, y2: 10.0, confidence, class_id }
    }

    #[test]
    fn decodes_center_boxes_and_scales() {
        // two candidates, two classes
        let head = Array2::from_shape_vec(
            (6, 2),
            vec![
                50.0, 10.0, // cx
                40.0, 10.0, // cy
                20.0, 4.0, // w
                10.0, 4.0, // h
                0.1, 0.05, // class 0
                0.8, 0.1, // class 1
            ],
        )
        .unwrap();

        let out = decode_candidates(head.view(), 2.0, 1.0, 0.25);
        assert_eq!(out.len(), 1);
        let d = &out[0];
        assert_eq!(d.class_id, 1);
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (80.0, 35.0, 120.0, 45.0));
        assert!((d.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn nan_scores_are_ignored() {
        let head = Array2::from_shape_vec((5, 1), vec![1.0, 1.0, 1.0, 1.0, f32::NAN]).unwrap();
        assert!(decode_candidates(head.view(), 1.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() {
        let out = nms(vec![det(0.0, 0.6, 0), det(1.0, 0.9, 0), det(1.0, 0.7, 1)], IOU_THRESHOLD, 10);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].confidence, 0.9);
        assert_eq!(out[1].class_id, 1);
    }

    #[test]
    fn result_is_capped() {
        let dets = (0..5).map(|i| det(i as f32 * 100.0, 0.5 + i as f32 / 10.0, 0)).collect();
        let out = nms(dets, IOU_THRESHOLD, 3);
        assert_eq!(out.len(), 3);
        assert!(out.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }
}
