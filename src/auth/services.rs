use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    repo::{UserRepoError, UserRepository},
    repo_types::User,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user with this username already exists")]
    AlreadyExists,
    #[error("user with this username does not exist")]
    UnknownUsername,
    #[error("user with this id does not exist")]
    UnknownId,
    #[error("invalid password")]
    InvalidCredential,
    #[error("user storage failure: {0}")]
    Persistence(#[source] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<UserRepoError> for AuthError {
    fn from(err: UserRepoError) -> Self {
        match err {
            UserRepoError::Duplicate => AuthError::AlreadyExists,
            UserRepoError::Database(e) => AuthError::Persistence(e),
        }
    }
}

/// Registers and authenticates users, handing out session tokens.
#[derive(Clone)]
pub struct CredentialService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl CredentialService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    /// Lookup-then-insert; a concurrent duplicate that slips past the lookup
    /// is caught by the store's unique constraint and reported the same way.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<String, AuthError> {
        if self.repo.find_by_username(username).await?.is_some() {
            warn!(%username, "username already registered");
            return Err(AuthError::AlreadyExists);
        }

        let user = User::new(username, hash_password(password)?);
        self.repo.save(&user).await?;

        info!(user_id = %user.id, %username, "user registered");
        Ok(self.keys.issue(&user)?)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UnknownUsername)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredential);
        }

        info!(user_id = %user.id, %username, "user logged in");
        Ok(self.keys.issue(&user)?)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UnknownId)
    }
}
