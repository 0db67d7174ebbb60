//! Trait abstractions for embedding generation
//!
//! The service layer talks to the model through `EmbeddingProvider`, so the
//! HTTP contract can be exercised with a deterministic provider in tests.

use super::device::Backend;
use crate::EmbeddingResult;
use async_trait::async_trait;

/// Trait for embedding generation providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Encode `texts` into unit-norm vectors, `batch_size` texts per forward pass
    ///
    /// Returns one embedding per input text, in input order.
    async fn encode(&self, texts: Vec<String>, batch_size: usize) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Get the dimensionality of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Short model name reported to clients
    fn model_name(&self) -> &str;

    /// Backend the model runs on
    fn backend(&self) -> Backend;
}
