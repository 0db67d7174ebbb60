//! Application state for Axum handlers
//!
//! The server starts `Uninitialized` and becomes `Ready` once the embedding
//! model has loaded and warmed up. The transition happens exactly once and is
//! never reversed.

use embedserve_embeddings::EmbeddingService;
use std::sync::{Arc, OnceLock};

/// Application state shared by all handlers
///
/// Cloning is cheap; every clone observes the same readiness.
#[derive(Clone, Default)]
pub struct AppState {
    embedding: Arc<OnceLock<Arc<EmbeddingService>>>,
}

impl AppState {
    /// Create state with no model loaded yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state that is already ready
    pub fn ready(service: Arc<EmbeddingService>) -> Self {
        let state = Self::new();
        state.mark_ready(service);
        state
    }

    /// Install the loaded service
    ///
    /// Returns `false` if a service was already installed; the first one is kept.
    pub fn mark_ready(&self, service: Arc<EmbeddingService>) -> bool {
        self.embedding.set(service).is_ok()
    }

    /// The loaded service, or `None` while the model is still loading
    pub fn embedding_service(&self) -> Option<&Arc<EmbeddingService>> {
        self.embedding.get()
    }

    pub fn is_ready(&self) -> bool {
        self.embedding.get().is_some()
    }
}
