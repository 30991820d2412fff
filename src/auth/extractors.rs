use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use super::claims::Identity;
use crate::error::ApiError;

/// Identity verified by [`require_auth`](super::middleware::require_auth).
///
/// Only usable behind the gate; elsewhere it rejects with 401.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("invalid or missing user ID".into()))
    }
}
