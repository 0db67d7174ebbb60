//! Unit test utilities
//!
//! Provides mock state for fast unit tests that don't download a model.

use crate::AppState;
use axum::response::Response;
use embedserve_embeddings::{Backend, EmbeddingService, MockEmbeddingProvider};
use std::sync::Arc;

/// Standard test result type for all test functions
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Ready `AppState` backed by the deterministic mock provider
pub fn mock_app_state(backend: Backend) -> AppState {
    AppState::ready(Arc::new(EmbeddingService::with_provider(Arc::new(
        MockEmbeddingProvider::new(backend),
    ))))
}

/// Collect a response body and parse it as JSON
pub async fn read_json(response: Response) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
