//! Request extractors

use crate::ApiError;
use crate::middleware::{RequestContext, correlation_id_from};
use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// JSON body extractor whose rejections use the API error shape
///
/// Behaves like `axum::Json`, but a missing content type, unparseable body or
/// wrong field types produce an `ApiErrorResponse` carrying the request's
/// correlation ID instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = correlation_id_from(req.extensions().get::<RequestContext>());
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::MalformedRequest {
                status: rejection.status(),
                message: rejection.body_text(),
                correlation_id,
            }),
        }
    }
}
