use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Copy of the author's id and username taken when the ad is published.
///
/// Stored inside the ad document; it is not refreshed if the user changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ad {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub image_url: String,
    pub price: f64,
    pub author: Author,
    pub created_at: OffsetDateTime,
}

impl Ad {
    pub fn new(title: String, text: String, image_url: String, price: f64, author: &User) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            text,
            image_url,
            price,
            author: Author::from(author),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct AdRow {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub image_url: String,
    pub price: f64,
    pub author: Json<Author>,
    pub created_at: OffsetDateTime,
}

impl From<AdRow> for Ad {
    fn from(r: AdRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            text: r.text,
            image_url: r.image_url,
            price: r.price,
            author: r.author.0,
            created_at: r.created_at,
        }
    }
}
