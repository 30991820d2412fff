use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};

use super::{
    options::{Options, SortBy},
    repo_types::{Ad, AdRow},
};

#[async_trait]
pub trait AdRepository: Send + Sync {
    async fn save(&self, ad: &Ad) -> Result<(), sqlx::Error>;
    /// One page of ads matching the price bounds, in the requested order.
    async fn find_all(&self, options: &Options) -> Result<Vec<Ad>, sqlx::Error>;
}

/// Ad documents in Postgres; the author snapshot is an embedded `jsonb` value.
#[derive(Clone)]
pub struct PgAdRepository {
    db: PgPool,
}

impl PgAdRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn save(&self, ad: &Ad) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ads (id, title, text, image_url, price, author, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(ad.id)
        .bind(&ad.title)
        .bind(&ad.text)
        .bind(&ad.image_url)
        .bind(ad.price)
        .bind(Json(&ad.author))
        .bind(ad.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_all(&self, options: &Options) -> Result<Vec<Ad>, sqlx::Error> {
        let mut qb = list_query(options);
        let rows = qb.build_query_as::<AdRow>().fetch_all(&self.db).await?;
        Ok(rows.into_iter().map(Ad::from).collect())
    }
}

fn list_query(options: &Options) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT id, title, text, image_url, price, author, created_at FROM ads",
    );

    let mut keyword = " WHERE ";
    if let Some(floor) = options.price_floor() {
        qb.push(keyword).push("price >= ").push_bind(floor);
        keyword = " AND ";
    }
    if let Some(ceiling) = options.price_ceiling() {
        qb.push(keyword).push("price <= ").push_bind(ceiling);
    }

    // Column and direction come from closed enums, never from raw input.
    let dir = options.order.sql();
    match options.sort_by {
        SortBy::CreatedAt => qb.push(format!(" ORDER BY created_at {dir}, id {dir}")),
        SortBy::Price => qb.push(format!(" ORDER BY price {dir}, created_at {dir}, id {dir}")),
    };
    qb.push(" LIMIT ").push_bind(options.limit);
    qb.push(" OFFSET ").push_bind(options.offset());
    qb
}

#[cfg(test)]
pub use memory::{FailingAdRepository, MemoryAdRepository};
