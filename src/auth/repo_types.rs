use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,                   // unique user ID
    pub username: String,           // unique, never changes
    #[serde(skip_serializing)]
    pub password_hash: String,      // argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime, // creation timestamp
}

impl User {
    pub fn new(username: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_owned(),
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
