//! Integration test utilities
//!
//! Builds the full router (middleware, limits, docs) around a mock-backed
//! embedding service, so the HTTP contract runs without a model download.

#![allow(dead_code)] // Each test binary uses a different subset

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, response::Response};
use embedserve_api::{AppState, routes::create_router};
use embedserve_config::ApiConfig;
use embedserve_embeddings::{Backend, EmbeddingService, MockEmbeddingProvider};

/// Standard test result type for all test functions
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Mock-backed service on the given backend
pub fn mock_service(backend: Backend) -> Arc<EmbeddingService> {
    Arc::new(EmbeddingService::with_provider(Arc::new(
        MockEmbeddingProvider::new(backend),
    )))
}

/// Full application router over `state` with default API settings
pub fn app(state: AppState) -> Router {
    create_router(state, &ApiConfig::default())
}

/// Full application router with a ready mock model
pub fn ready_app(backend: Backend) -> Router {
    app(AppState::ready(mock_service(backend)))
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Result<Request<Body>, axum::http::Error> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
}

pub fn get(uri: &str) -> Result<Request<Body>, axum::http::Error> {
    Request::builder().uri(uri).body(Body::empty())
}

/// Collect a response body and parse it as JSON
pub async fn read_json(response: Response) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Parse a JSON array of numbers into a vector
pub fn as_vector(value: &serde_json::Value) -> Vec<f32> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(serde_json::Value::as_f64)
                .map(|x| x as f32)
                .collect()
        })
        .unwrap_or_default()
}
