use axum::extract::Multipart;
use std::collections::HashMap;
use std::str::FromStr;

use super::error::ApiError;
use crate::domain::{
    model::{InferenceParams, SamplingOptions, DEFAULT_CONFIDENCE, DEFAULT_FRAME_STRIDE, DEFAULT_INFERENCE_SIZE, DEFAULT_MAX_FRAMES},
    upload::Upload,
};

pub const FILE_FIELD: &str = "file";

/// A multipart upload: the `file` part plus plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    file: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("multipart error: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == FILE_FIELD {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {e}")))?;
                form.file = Some(Upload { filename, bytes: bytes.to_vec() });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read field '{name}': {e}")))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self) -> Result<Upload, ApiError> {
        let upload = self
            .file
            .take()
            .ok_or_else(|| ApiError::bad_request(format!("no '{FILE_FIELD}' field provided")))?;
        if upload.filename.trim().is_empty() {
            return Err(ApiError::bad_request("empty filename"));
        }
        Ok(upload)
    }

    /// Parses an optional text field, falling back to `default` when absent or blank.
    pub fn parse<T>(&self, name: &str, default: T) -> Result<T, ApiError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.fields.get(name).map(|v| v.trim()) {
            None | Some("") => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| ApiError::bad_request(format!("invalid value for '{name}': {e}"))),
        }
    }

    /// `conf` and `imgsz`.
    pub fn inference_params(&self) -> Result<InferenceParams, ApiError> {
        let conf = self.parse("conf", DEFAULT_CONFIDENCE)?;
        let imgsz = self.parse("imgsz", DEFAULT_INFERENCE_SIZE)?;
        Ok(InferenceParams::new(conf, imgsz)?)
    }

    /// `frame_stride` and `max_frames`.
    pub fn sampling_options(&self) -> Result<SamplingOptions, ApiError> {
        let stride = self.parse("frame_stride", DEFAULT_FRAME_STRIDE as i64)?;
        let max_frames = self.parse("max_frames", DEFAULT_MAX_FRAMES as i64)?;
        Ok(SamplingOptions::new(stride, max_frames)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> UploadForm {
        UploadForm {
            file: None,
            fields: fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn defaults_apply_when_fields_are_missing_or_blank() {
        let f = form(&[("conf", " ")]);
        assert_eq!(f.inference_params().unwrap(), InferenceParams::default());
        let sampling = f.sampling_options().unwrap();
        assert_eq!((sampling.stride(), sampling.max_frames()), (5, 200));
    }

    #[test]
    fn explicit_values_are_parsed() {
        let f = form(&[("conf", "0.5"), ("imgsz", "320"), ("frame_stride", "10"), ("max_frames", "5")]);
        let params = f.inference_params().unwrap();
        assert_eq!((params.confidence_threshold, params.inference_size), (0.5, 320));
        let sampling = f.sampling_options().unwrap();
        assert_eq!((sampling.stride(), sampling.max_frames()), (10, 5));
    }

    #[test]
    fn bad_values_are_client_errors() {
        for fields in [
            vec![("conf", "high")],
            vec![("conf", "2")],
            vec![("imgsz", "-1")],
        ] {
            assert_eq!(form(&fields).inference_params().unwrap_err().status, 400);
        }
        for fields in [vec![("frame_stride", "0")], vec![("frame_stride", "-2")], vec![("max_frames", "x")]] {
            assert_eq!(form(&fields).sampling_options().unwrap_err().status, 400);
        }
    }

    #[test]
    fn missing_or_unnamed_file_is_rejected() {
        assert_eq!(form(&[]).take_file().unwrap_err().status, 400);

        let mut unnamed = UploadForm {
            file: Some(Upload { filename: String::new(), bytes: vec![1] }),
            fields: HashMap::new(),
        };
        assert_eq!(unnamed.take_file().unwrap_err().message, "empty filename");
    }
}
