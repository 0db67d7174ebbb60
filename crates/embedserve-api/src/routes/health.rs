use crate::AppState;
use crate::middleware::{RequestContext, correlation_id_from};
use axum::{Extension, Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness and model readiness
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process is serving
    pub status: String,
    /// Device id ("mps", "cuda" or "cpu"); null until the model is loaded
    pub device: Option<String>,
    pub model_loaded: bool,
    /// Embedding dimension; null until the model is loaded
    pub embedding_dimensions: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
/// Health check endpoint
///
/// Never fails; reports whether the model has finished loading.
#[instrument(skip_all, fields(correlation_id))]
pub async fn health_check(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
) -> Json<HealthResponse> {
    let correlation_id = correlation_id_from(context.as_deref());
    tracing::Span::current().record("correlation_id", correlation_id.to_string());

    let service = state.embedding_service();
    debug!(model_loaded = service.is_some(), "Health check request");

    Json(HealthResponse {
        status: "healthy".to_string(),
        device: service.map(|s| s.backend().to_string()),
        model_loaded: service.is_some(),
        embedding_dimensions: service.map(|s| s.embedding_dimension()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestResult, mock_app_state, read_json};
    use axum::{body::Body, http::Request};
    use embedserve_embeddings::Backend;
    use tower::ServiceExt;

    fn get_health() -> Result<Request<Body>, axum::http::Error> {
        Request::builder().uri("/health").body(Body::empty())
    }

    #[tokio::test]
    async fn reports_unloaded_model_with_nulls() -> TestResult {
        let app = routes().with_state(AppState::new());
        let response = app.oneshot(get_health()?).await?;
        assert_eq!(response.status(), 200);

        let body = read_json(response).await?;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], false);
        assert!(body["device"].is_null());
        assert!(body["embedding_dimensions"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn reports_device_and_dimension_when_ready() -> TestResult {
        let app = routes().with_state(mock_app_state(Backend::Mps));
        let body = read_json(app.oneshot(get_health()?).await?).await?;

        assert_eq!(body["model_loaded"], true);
        assert_eq!(body["device"], "mps");
        assert_eq!(body["embedding_dimensions"], 384);
        Ok(())
    }
}
