//! Error types for the embedserve-embeddings crate
//!
//! This module defines embedding-specific error types for device selection,
//! model loading, tokenization, and inference.

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Comprehensive error type for embedding operations
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model download and initialization errors
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    /// Tokenization and text processing errors
    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    /// ML inference and computation errors
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Device and hardware errors (Metal/CUDA/CPU)
    #[error("Device error: {0}")]
    Device(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request rejected before reaching the model
    #[error("{0}")]
    InvalidInput(String),

    /// General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmbeddingError {
    /// Create a model loading error
    pub fn model_load_error(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an inference error
    pub fn inference_error(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the caller sent a bad request (as opposed to a server-side failure)
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Tensor operations fail during inference
impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        Self::Inference(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_message_is_passed_through() {
        let err = EmbeddingError::invalid_input("texts list cannot be empty");
        assert_eq!(err.to_string(), "texts list cannot be empty");
        assert!(err.is_client_error());
    }

    #[test]
    fn inference_errors_are_server_side() {
        let err = EmbeddingError::inference_error("out of memory");
        assert_eq!(err.to_string(), "Inference failed: out of memory");
        assert!(!err.is_client_error());
    }
}
