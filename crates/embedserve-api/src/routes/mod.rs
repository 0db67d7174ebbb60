pub mod embed;
pub mod health;
pub mod stats;

use crate::AppState;
use axum::{Router, extract::DefaultBodyLimit, middleware};
use embedserve_config::ApiConfig;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new()
        .merge(health::routes())
        .merge(embed::routes())
        .merge(stats::routes());

    if config.enable_docs {
        router = router.merge(crate::openapi::routes()); // OpenAPI JSON endpoint
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        // Add correlation ID middleware to all routes
        .layer(middleware::from_fn(
            crate::middleware::correlation_id_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}
