use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use super::postprocess::{decode_candidates, nms, IOU_THRESHOLD, MAX_DETECTIONS};
use crate::application::ports::Detector;
use crate::domain::{
    catalog::ClassCatalog,
    detection::RawDetection,
    errors::{DomainError, DomainResult},
    model::InferenceParams,
};

/// YOLO detector backed by an ONNX Runtime session.
///
/// The session needs exclusive access per run, so concurrent requests queue on the mutex.
pub struct OnnxYoloDetector {
    session: Mutex<Session>,
    catalog: ClassCatalog,
}

impl OnnxYoloDetector {
    /// Class names come from `labels` when given, otherwise from the `names`
    /// metadata entry Ultralytics writes into its exports.
    pub fn load(path: &Path, labels: Option<ClassCatalog>) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA is optional: registered when available, CPU otherwise.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;

        let catalog = match labels {
            Some(catalog) => catalog,
            None => catalog_from_metadata(&session),
        };

        Ok(Self { session: Mutex::new(session), catalog })
    }

    fn run(&self, rgb: &RgbImage, params: &InferenceParams) -> Result<Vec<RawDetection>> {
        let imgsz = params.inference_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;

        let mut session = self.session.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let head = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let candidates = decode_candidates(head, sx, sy, params.confidence_threshold);
        Ok(nms(candidates, IOU_THRESHOLD, MAX_DETECTIONS))
    }
}

fn catalog_from_metadata(session: &Session) -> ClassCatalog {
    let names = session
        .metadata()
        .ok()
        .and_then(|m| m.custom("names").ok().flatten());

    match names.as_deref().and_then(ClassCatalog::from_ultralytics_metadata) {
        Some(catalog) => catalog,
        None => {
            tracing::warn!("model has no readable class names, numeric ids will be reported");
            ClassCatalog::default()
        }
    }
}

impl Detector for OnnxYoloDetector {
    fn name(&self) -> &str {
        "onnx-yolo"
    }

    fn class_catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    fn infer(&self, image: &RgbImage, params: &InferenceParams) -> DomainResult<Vec<RawDetection>> {
        self.run(image, params)
            .map_err(|e| DomainError::Inference(format!("{e:#}")))
    }
}
