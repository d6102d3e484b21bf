use image::RgbImage;

use crate::application::ports::Detector;
use crate::domain::{
    catalog::ClassCatalog,
    detection::RawDetection,
    errors::DomainResult,
    model::InferenceParams,
};

pub const STUB_MODEL: &str = "stub://";

/// Deterministic detector for running the service without a model file.
///
/// Splits the image into a 2×2 grid and reports every quadrant whose mean
/// brightness, read as a confidence, clears the threshold.
pub struct StubDetector {
    catalog: ClassCatalog,
}

impl StubDetector {
    pub fn new() -> Self {
        Self { catalog: ClassCatalog::from_names(["bright region"]) }
    }
}

impl Default for StubDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for StubDetector {
    fn name(&self) -> &str {
        "stub"
    }

    fn class_catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    fn infer(&self, image: &RgbImage, params: &InferenceParams) -> DomainResult<Vec<RawDetection>> {
        let (w, h) = image.dimensions();
        let (hw, hh) = (w / 2, h / 2);
        let quadrants = [(0, 0, hw, hh), (hw, 0, w, hh), (0, hh, hw, h), (hw, hh, w, h)];

        let mut out = Vec::new();
        for (x1, y1, x2, y2) in quadrants {
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            let confidence = mean_brightness(image, x1, y1, x2, y2);
            if confidence >= params.confidence_threshold {
                out.push(RawDetection {
                    x1: x1 as f32,
                    y1: y1 as f32,
                    x2: x2 as f32,
                    y2: y2 as f32,
                    confidence,
                    class_id: 0,
                });
            }
        }
        Ok(out)
    }
}

fn mean_brightness(image: &RgbImage, x1: u32, y1: u32, x2: u32, y2: u32) -> f32 {
    let mut total = 0u64;
    for y in y1..y2 {
        for x in x1..x2 {
            let p = image.get_pixel(x, y);
            total += (p[0] as u64 + p[1] as u64 + p[2] as u64) / 3;
        }
    }
    let count = ((x2 - x1) * (y2 - y1)) as u64;
    total as f32 / count as f32 / 255.0
}
