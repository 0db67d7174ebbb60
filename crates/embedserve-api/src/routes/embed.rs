//! Embedding endpoints.
//!
//! - `POST /embed/batch` - encode up to 1000 texts; the batch size hint is
//!   clamped to the device's ceiling (mps 64, cuda 32, cpu 16)
//! - `POST /embed/single` - encode one text
//!
//! # Example
//!
//! ```json
//! POST /embed/batch
//! { "texts": ["first document", "second document"], "batch_size": 32 }
//! ```
//!
//! Response:
//! ```json
//! {
//!   "embeddings": [[0.013, -0.071, ...], [0.044, 0.002, ...]],
//!   "processing_time": 0.0123,
//!   "device_used": "cpu",
//!   "batch_size": 16
//! }
//! ```

use crate::extract::ApiJson;
use crate::middleware::{RequestContext, correlation_id_from};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    Json, Router,
    extract::{Extension, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/embed/batch", post(embed_batch_handler))
        .route("/embed/single", post(embed_single_handler))
}

/// Request payload for batch embedding
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchEmbedRequest {
    /// Texts to encode (1 to 1000 entries)
    pub texts: Vec<String>,
    /// Batch size hint; capped at the device ceiling. Defaults to 32.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Response for batch embedding
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchEmbedResponse {
    /// One unit-norm vector per input text, in input order
    pub embeddings: Vec<Vec<f32>>,
    /// Wall-clock encode time in seconds
    pub processing_time: f64,
    pub device_used: String,
    /// Batch size actually applied
    pub batch_size: usize,
}

/// Request payload for single-text embedding
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SingleEmbedRequest {
    pub text: String,
}

/// Response for single-text embedding
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SingleEmbedResponse {
    pub embedding: Vec<f32>,
    /// Wall-clock encode time in seconds
    pub processing_time: f64,
    pub device_used: String,
}

#[utoipa::path(
    post,
    path = "/embed/batch",
    tag = "embed",
    request_body = BatchEmbedRequest,
    responses(
        (status = 200, description = "Embeddings generated", body = BatchEmbedResponse),
        (status = 400, description = "Empty or oversized request, or unparseable JSON", body = crate::ApiErrorResponse),
        (status = 422, description = "Request body has the wrong shape", body = crate::ApiErrorResponse),
        (status = 500, description = "Model failed to encode", body = crate::ApiErrorResponse),
        (status = 503, description = "Model not initialized", body = crate::ApiErrorResponse)
    )
)]
/// Generate embeddings for a batch of texts
///
/// # Errors
///
/// - `NotReady` while the model is loading
/// - `InvalidInput` for an empty list, more than 1000 texts or a zero batch size
/// - `EncodingFailure` if the model fails
#[instrument(skip_all, fields(correlation_id))]
pub async fn embed_batch_handler(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    ApiJson(request): ApiJson<BatchEmbedRequest>,
) -> ApiResult<Json<BatchEmbedResponse>> {
    let correlation_id = correlation_id_from(context.as_deref());
    tracing::Span::current().record("correlation_id", correlation_id.to_string());

    let service = state
        .embedding_service()
        .ok_or_else(|| ApiError::NotReady {
            correlation_id: correlation_id.clone(),
        })?;

    info!(
        correlation_id = %correlation_id,
        texts = request.texts.len(),
        batch_size = request.batch_size,
        "Processing batch embedding request"
    );

    let result = service
        .embed_batch(request.texts, request.batch_size)
        .await
        .map_err(|e| ApiError::from_embedding(&e, correlation_id))?;

    Ok(Json(BatchEmbedResponse {
        embeddings: result.embeddings,
        processing_time: result.processing_time.as_secs_f64(),
        device_used: result.backend.to_string(),
        batch_size: result.batch_size,
    }))
}

#[utoipa::path(
    post,
    path = "/embed/single",
    tag = "embed",
    request_body = SingleEmbedRequest,
    responses(
        (status = 200, description = "Embedding generated", body = SingleEmbedResponse),
        (status = 422, description = "Request body has the wrong shape", body = crate::ApiErrorResponse),
        (status = 500, description = "Model failed to encode", body = crate::ApiErrorResponse),
        (status = 503, description = "Model not initialized", body = crate::ApiErrorResponse)
    )
)]
/// Generate the embedding for one text
///
/// # Errors
///
/// - `NotReady` while the model is loading
/// - `EncodingFailure` if the model fails
#[instrument(skip_all, fields(correlation_id))]
pub async fn embed_single_handler(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
    ApiJson(request): ApiJson<SingleEmbedRequest>,
) -> ApiResult<Json<SingleEmbedResponse>> {
    let correlation_id = correlation_id_from(context.as_deref());
    tracing::Span::current().record("correlation_id", correlation_id.to_string());

    let service = state
        .embedding_service()
        .ok_or_else(|| ApiError::NotReady {
            correlation_id: correlation_id.clone(),
        })?;

    let result = service
        .embed_single(request.text)
        .await
        .map_err(|e| ApiError::from_embedding(&e, correlation_id))?;

    Ok(Json(SingleEmbedResponse {
        embedding: result.embedding,
        processing_time: result.processing_time.as_secs_f64(),
        device_used: result.backend.to_string(),
    }))
}
