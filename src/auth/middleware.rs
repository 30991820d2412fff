use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{auth::jwt::JwtKeys, error::ApiError};

pub const BEARER_PREFIX: &str = "Bearer ";

/// Gate for protected routes.
///
/// Verifies the bearer token and stores the resulting
/// [`Identity`](crate::auth::claims::Identity) in the request extensions.
/// Any failure answers 401 without running the inner handler.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix(BEARER_PREFIX).unwrap_or(v).trim())
        .unwrap_or_default();

    if token.is_empty() {
        return Err(ApiError::Unauthorized(
            "no authorization header in request".into(),
        ));
    }

    let identity = keys.verify(token).map_err(|e| {
        warn!(error = %e, "rejected bearer token");
        ApiError::Unauthorized(e.to_string())
    })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
