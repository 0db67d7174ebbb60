//! Request middleware

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use embedserve_common::CorrelationId;

/// Header carrying the correlation ID in both directions
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Per-request context made available to handlers as an extension
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: CorrelationId,
}

/// Attach a correlation ID to every request and echo it on the response
///
/// A valid UUID in the incoming `X-Correlation-ID` header is reused; anything
/// else is replaced with a fresh ID.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(CorrelationId::parse)
        .unwrap_or_default();

    request.extensions_mut().insert(RequestContext {
        correlation_id: correlation_id.clone(),
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    response
}

/// Correlation ID from the request context, or a fresh one when the
/// middleware is not installed
pub fn correlation_id_from(context: Option<&RequestContext>) -> CorrelationId {
    context.map_or_else(CorrelationId::new, |ctx| ctx.correlation_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestResult;
    use axum::{Extension, Router, body::Body, http::Request as HttpRequest, routing::get};
    use tower::ServiceExt;

    fn echo_router() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|Extension(ctx): Extension<RequestContext>| async move {
                    ctx.correlation_id.to_string()
                }),
            )
            .layer(axum::middleware::from_fn(correlation_id_middleware))
    }

    #[tokio::test]
    async fn reuses_valid_incoming_id() -> TestResult {
        let incoming = CorrelationId::new().to_string();
        let request = HttpRequest::builder()
            .uri("/echo")
            .header(CORRELATION_ID_HEADER, &incoming)
            .body(Body::empty())?;

        let response = echo_router().oneshot(request).await?;
        assert_eq!(response.headers()[CORRELATION_ID_HEADER].to_str()?, incoming);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(std::str::from_utf8(&body)?, incoming);
        Ok(())
    }

    #[tokio::test]
    async fn replaces_invalid_incoming_id() -> TestResult {
        let request = HttpRequest::builder()
            .uri("/echo")
            .header(CORRELATION_ID_HEADER, "definitely-not-a-uuid")
            .body(Body::empty())?;

        let response = echo_router().oneshot(request).await?;
        let header = response.headers()[CORRELATION_ID_HEADER].to_str()?;
        assert!(CorrelationId::parse(header).is_some());
        Ok(())
    }
}
