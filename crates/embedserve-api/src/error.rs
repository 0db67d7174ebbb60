//! Structured API error handling for the embedserve API.
//!
//! Clients see three kinds of failure:
//!
//! - **`NOT_READY`** (503): the model has not finished loading
//! - **`MALFORMED_REQUEST`** (400/415/422): the body was not a valid JSON request
//! - **`INVALID_INPUT`** (400): the request was rejected before reaching the model
//! - **`ENCODING_FAILURE`** (500): the model failed; the underlying message is passed through
//!
//! Every error carries the request's correlation ID, echoed in the body and in
//! the `X-Correlation-ID` header.

use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use embedserve_common::CorrelationId;
use embedserve_embeddings::EmbeddingError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Seconds a client should wait before retrying while the model loads
const NOT_READY_RETRY_AFTER_SECS: u64 = 5;

/// Structured API error types with correlation IDs for request tracking.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The model is still loading.
    #[error("Model not initialized")]
    NotReady { correlation_id: CorrelationId },

    /// The body could not be read as the expected JSON request.
    #[error("{message}")]
    MalformedRequest {
        status: StatusCode,
        message: String,
        correlation_id: CorrelationId,
    },

    /// The request failed validation.
    #[error("{message}")]
    InvalidInput {
        message: String,
        correlation_id: CorrelationId,
    },

    /// The model raised an error while encoding.
    #[error("Embedding generation failed: {message}")]
    EncodingFailure {
        message: String,
        correlation_id: CorrelationId,
    },
}

/// Error response sent to API clients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Machine-readable error kind
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Correlation ID for tracking and support
    #[schema(value_type = String)]
    pub correlation_id: CorrelationId,
    /// When to retry (for transient errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    /// Map a service-layer error onto the client-visible kinds
    pub fn from_embedding(err: &EmbeddingError, correlation_id: CorrelationId) -> Self {
        if err.is_client_error() {
            Self::InvalidInput {
                message: err.to_string(),
                correlation_id,
            }
        } else {
            Self::EncodingFailure {
                message: err.to_string(),
                correlation_id,
            }
        }
    }

    pub const fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::NotReady { correlation_id }
            | Self::MalformedRequest { correlation_id, .. }
            | Self::InvalidInput { correlation_id, .. }
            | Self::EncodingFailure { correlation_id, .. } => correlation_id,
        }
    }

    /// Get the HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::MalformedRequest { status, .. } => *status,
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::EncodingFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotReady { .. } => "NOT_READY",
            Self::MalformedRequest { .. } => "MALFORMED_REQUEST",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::EncodingFailure { .. } => "ENCODING_FAILURE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let correlation_id = self.correlation_id().clone();

        match &self {
            Self::EncodingFailure { .. } => {
                error!(correlation_id = %correlation_id, error = %self, "Encoding failure");
            }
            Self::NotReady { .. } => {
                warn!(correlation_id = %correlation_id, "Request rejected, model not ready");
            }
            Self::MalformedRequest { .. } | Self::InvalidInput { .. } => {
                warn!(correlation_id = %correlation_id, error = %self, "Client error");
            }
        }

        let error_response = ApiErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
            correlation_id: correlation_id.clone(),
            retry_after: matches!(self, Self::NotReady { .. }).then_some(NOT_READY_RETRY_AFTER_SECS),
        };

        let mut response = (status, Json(error_response)).into_response();

        if let Ok(header_value) = correlation_id.to_string().parse() {
            response
                .headers_mut()
                .insert(CORRELATION_ID_HEADER, header_value);
        }

        response
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
