use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{Claims, Identity, UserClaim, USERNAME_CLAIM, USER_CLAIM, USER_ID_CLAIM};
use super::repo_types::User;
use crate::{config::JwtConfig, state::AppState};

const ALGORITHM: Algorithm = Algorithm::HS256;
/// Any HMAC variant keyed with the server secret is accepted on verify.
const ACCEPTED: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a presented token was refused. Every variant is an authentication
/// failure; the message only narrows down which check tripped.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to parse bearer token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("missing user key")]
    MissingUser,
    #[error("invalid user data")]
    InvalidUser,
    #[error("no appropriate ID key found in bearer token")]
    MissingUserId,
    #[error("unexpected format of userID")]
    UserIdNotString,
    #[error("userID should be a UUID")]
    UserIdNotUuid,
}

/// HMAC signing/verification keys plus the token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self::new(&cfg.secret, cfg.ttl())
    }

    pub fn issue(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            user: UserClaim {
                username: user.username.clone(),
                id: user.id.to_string(),
            },
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    /// Checks algorithm, signature and expiry, then pulls the identity out
    /// of the nested `user` claim.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.algorithms = ACCEPTED.to_vec();
        validation.leeway = 0;
        validation.validate_aud = false;

        let data = decode::<Map<String, Value>>(token, &self.decoding, &validation)
            .map_err(TokenError::Invalid)?;
        let identity = identity_from_claims(&data.claims)?;
        debug!(user_id = %identity.id, "jwt verified");
        Ok(identity)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

fn identity_from_claims(claims: &Map<String, Value>) -> Result<Identity, TokenError> {
    let user = claims
        .get(USER_CLAIM)
        .ok_or(TokenError::MissingUser)?
        .as_object()
        .ok_or(TokenError::InvalidUser)?;

    let raw_id = user
        .get(USER_ID_CLAIM)
        .ok_or(TokenError::MissingUserId)?
        .as_str()
        .ok_or(TokenError::UserIdNotString)?;
    let id = Uuid::parse_str(raw_id).map_err(|_| TokenError::UserIdNotUuid)?;

    let username = user
        .get(USERNAME_CLAIM)
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(Identity { id, username })
}
