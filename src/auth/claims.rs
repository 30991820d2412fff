use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_CLAIM: &str = "user";
pub const USER_ID_CLAIM: &str = "id";
pub const USERNAME_CLAIM: &str = "username";

/// Identity block nested under the `user` claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaim {
    pub username: String,
    pub id: String,
}

/// Payload signed into every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: UserClaim,
    pub iat: i64, // issued at (unix timestamp)
    pub exp: i64, // expires at (unix timestamp)
}

/// Verified caller identity, injected into request extensions by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: Option<String>,
}
