pub mod http;
pub mod onnx;
pub mod storage;
pub mod stub;
pub mod video;

use std::path::Path;
use std::sync::Arc;

use crate::application::ports::Detector;
use crate::domain::{
    catalog::ClassCatalog,
    errors::{DomainError, DomainResult},
};

/// Loads the detector named by `model`: `stub://` or a path to an `.onnx` export.
pub fn load_detector(model: &str, labels: Option<&Path>) -> DomainResult<Arc<dyn Detector>> {
    if model == stub::STUB_MODEL {
        return Ok(Arc::new(stub::StubDetector::new()));
    }

    let path = Path::new(model);
    if !path.exists() {
        return Err(DomainError::ModelLoad(format!("model file not found: {model}")));
    }
    let labels = labels.map(load_labels).transpose()?;
    load_onnx(path, labels)
}

fn load_labels(path: &Path) -> DomainResult<ClassCatalog> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DomainError::ModelLoad(format!("cannot read labels {}: {e}", path.display())))?;
    let catalog = if path.extension().is_some_and(|e| e == "json") {
        let value = serde_json::from_str(&text)
            .map_err(|e| DomainError::ModelLoad(format!("invalid labels {}: {e}", path.display())))?;
        ClassCatalog::from_json(&value)
    } else {
        ClassCatalog::from_labels_text(&text)
    };
    Ok(catalog)
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path, labels: Option<ClassCatalog>) -> DomainResult<Arc<dyn Detector>> {
    let detector = onnx::yolo_engine::OnnxYoloDetector::load(path, labels)
        .map_err(|e| DomainError::ModelLoad(format!("{}: {e:#}", path.display())))?;
    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path, _labels: Option<ClassCatalog>) -> DomainResult<Arc<dyn Detector>> {
    Err(DomainError::ModelLoad(format!(
        "{}: ONNX models require the onnx feature",
        path.display()
    )))
}
