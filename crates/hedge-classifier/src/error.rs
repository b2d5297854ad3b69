//! Classifier error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier model unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid model shape: {0}")]
    InvalidShape(String),

    #[error("Non-finite model parameter in layer {layer}")]
    NonFiniteParameter { layer: usize },

    #[error("Non-finite feature at index {index}")]
    InvalidFeature { index: usize },

    #[error("Model parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;
