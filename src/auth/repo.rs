use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    #[error("username already taken")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: &User) -> Result<(), UserRepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserRepoError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepoError>;
}

/// Users live in Postgres; `username` carries a unique constraint.
#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn save(&self, user: &User) -> Result<(), UserRepoError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation());
            if duplicate {
                UserRepoError::Duplicate
            } else {
                UserRepoError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, UserRepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserRepoError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
pub use memory::MemoryUserRepository;
