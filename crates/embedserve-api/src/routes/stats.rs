use crate::AppState;
use crate::middleware::{RequestContext, correlation_id_from};
use axum::{Extension, Json, Router, extract::State, routing::get};
use embedserve_embeddings::ServiceStats;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

pub fn routes() -> Router<AppState> {
    Router::new().route("/stats", get(stats_handler))
}

/// Loaded model and visible hardware
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelStats {
    pub device: String,
    pub model_name: String,
    pub embedding_dimensions: usize,
    /// Batch size ceiling for `device`
    pub max_batch_size: usize,
    pub cuda_available: bool,
    pub mps_available: bool,
    /// Number of CUDA devices (0 when CUDA is unavailable)
    pub device_count: usize,
}

impl From<ServiceStats> for ModelStats {
    fn from(stats: ServiceStats) -> Self {
        Self {
            device: stats.device.to_string(),
            model_name: stats.model_name,
            embedding_dimensions: stats.embedding_dimensions,
            max_batch_size: stats.max_batch_size,
            cuda_available: stats.cuda_available,
            mps_available: stats.mps_available,
            device_count: stats.device_count,
        }
    }
}

/// `/stats` body: the stats object, or an error object before the model loads
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum StatsResponse {
    Ready(ModelStats),
    NotReady { error: String },
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Model stats, or an error object while the model loads", body = StatsResponse)
    )
)]
/// Service statistics
///
/// Always answers 200; before the model is loaded the body is
/// `{"error": "Model not initialized"}`.
#[instrument(skip_all, fields(correlation_id))]
pub async fn stats_handler(
    State(state): State<AppState>,
    context: Option<Extension<RequestContext>>,
) -> Json<StatsResponse> {
    let correlation_id = correlation_id_from(context.as_deref());
    tracing::Span::current().record("correlation_id", correlation_id.to_string());
    debug!("Stats request");

    let response = state.embedding_service().map_or_else(
        || StatsResponse::NotReady {
            error: "Model not initialized".to_string(),
        },
        |service| StatsResponse::Ready(service.stats().into()),
    );
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestResult, mock_app_state, read_json};
    use axum::{body::Body, http::Request};
    use embedserve_embeddings::Backend;
    use tower::ServiceExt;

    fn get_stats() -> Result<Request<Body>, axum::http::Error> {
        Request::builder().uri("/stats").body(Body::empty())
    }

    #[tokio::test]
    async fn unloaded_model_returns_error_object_with_200() -> TestResult {
        let app = routes().with_state(AppState::new());
        let response = app.oneshot(get_stats()?).await?;
        assert_eq!(response.status(), 200);

        let body = read_json(response).await?;
        assert_eq!(body, serde_json::json!({ "error": "Model not initialized" }));
        Ok(())
    }

    #[tokio::test]
    async fn ready_model_reports_ceiling_for_device() -> TestResult {
        let app = routes().with_state(mock_app_state(Backend::Mps));
        let body = read_json(app.oneshot(get_stats()?).await?).await?;

        assert_eq!(body["device"], "mps");
        assert_eq!(body["model_name"], "all-MiniLM-L6-v2");
        assert_eq!(body["embedding_dimensions"], 384);
        assert_eq!(body["max_batch_size"], 64);
        assert_eq!(body["device_count"], 0);
        assert!(body.get("error").is_none());
        Ok(())
    }
}
