pub mod postprocess;
#[cfg(feature = "onnx")]
pub mod yolo_engine;
