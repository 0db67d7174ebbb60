//! `OpenAPI` documentation generation

use crate::AppState;
use axum::{Json, Router, response::IntoResponse, routing::get};
use utoipa::OpenApi;

/// `OpenAPI` documentation for the embedserve API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::embed::embed_batch_handler,
        crate::routes::embed::embed_single_handler,
        crate::routes::stats::stats_handler,
    ),
    components(
        schemas(
            // Embedding schemas
            crate::routes::embed::BatchEmbedRequest,
            crate::routes::embed::BatchEmbedResponse,
            crate::routes::embed::SingleEmbedRequest,
            crate::routes::embed::SingleEmbedResponse,

            // Service schemas
            crate::routes::health::HealthResponse,
            crate::routes::stats::StatsResponse,
            crate::routes::stats::ModelStats,

            // Common schemas
            crate::error::ApiErrorResponse,
        )
    ),
    tags(
        (name = "embed", description = "Text embedding operations"),
        (name = "health", description = "Liveness and readiness"),
        (name = "stats", description = "Model and hardware information"),
    ),
    info(
        title = "embedserve API",
        version = "0.1.0",
        description = "Sentence-embedding service with GPU acceleration",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8001", description = "Local development server")
    )
)]
pub struct ApiDoc;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

/// Returns `OpenAPI` JSON as a response
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_endpoint() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "embedserve API");
        for path in ["/health", "/embed/batch", "/embed/single", "/stats"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
