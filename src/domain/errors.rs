use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("cannot open video: {0}")]
    SourceUnavailable(String),
    /// A frame could not be read after the video was opened.
    #[error("video decode error: {0}")]
    Decode(String),
    #[error("inference error: {0}")]
    Inference(String),
    #[error("scratch storage error: {0}")]
    Storage(String),
    #[error("cannot load model: {0}")]
    ModelLoad(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
