//! embedserve embedding generation crate
//!
//! Selects an execution device, loads a sentence-embedding transformer onto it
//! with Candle, and exposes the request-level logic (validation, batch-size
//! clamping, timing, stats) the HTTP layer calls into.

pub mod embedding;
pub mod error;

// Re-export main types
pub use embedding::{
    Backend, BackendAvailability, BatchEmbedding, EmbeddingModel, EmbeddingProvider,
    EmbeddingService, SelectedDevice, ServiceStats, SingleEmbedding, select_device,
};
#[cfg(any(test, feature = "test-utils"))]
pub use embedding::MockEmbeddingProvider;
pub use embedserve_config::EmbeddingConfig;
pub use error::{EmbeddingError, EmbeddingResult};
