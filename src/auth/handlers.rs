//! `/register` and `/login`.
//!
//! Both answer with the session token in an `Authorization: Bearer` header.
//! Register echoes back only `{"username"}`; the submitted password never
//! leaves the request.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{RegisteredUser, TokenResponse, UserDto},
        middleware::BEARER_PREFIX,
        services::AuthError,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::AlreadyExists => ApiError::Conflict(message),
            AuthError::UnknownUsername | AuthError::UnknownId => ApiError::NotFound(message),
            // Kept as a server error for client compatibility.
            AuthError::InvalidCredential => ApiError::Internal(message),
            AuthError::Persistence(_) | AuthError::Internal(_) => ApiError::Internal(message),
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<UserDto>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<RegisteredUser>), ApiError> {
    let Json(payload) = payload?;

    if let Err(errors) = payload.validate() {
        warn!(fields = ?errors.keys().collect::<Vec<_>>(), "register validation failed");
        return Err(ApiError::Validation(errors));
    }

    let token = state
        .users
        .register(&payload.username, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        bearer_header(&token)?,
        Json(RegisteredUser {
            username: payload.username,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<UserDto>, JsonRejection>,
) -> Result<(HeaderMap, Json<TokenResponse>), ApiError> {
    let Json(payload) = payload?;

    let token = state
        .users
        .login(&payload.username, &payload.password)
        .await?;

    Ok((bearer_header(&token)?, Json(TokenResponse { token })))
}

fn bearer_header(token: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}"))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
