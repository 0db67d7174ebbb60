pub mod bootstrap;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

#[cfg(test)]
pub mod test_utils;

// Export structured error types
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use extract::ApiJson;
pub use middleware::{CORRELATION_ID_HEADER, RequestContext, correlation_id_middleware};
pub use state::AppState;
