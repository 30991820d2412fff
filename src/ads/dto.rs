use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::Ad;
use crate::validation::{self, Field, FieldErrors, Rule, Value};

pub const IMAGE_URL_FIELD: &str = "image_url";

const TITLE_RULES: &[Rule] = &[Rule::Required, Rule::MinChars(5), Rule::MaxChars(20)];
const TEXT_RULES: &[Rule] = &[Rule::Required, Rule::MinChars(20), Rule::MaxChars(1000)];
const IMAGE_URL_RULES: &[Rule] = &[Rule::Required, Rule::HttpUrl];
const PRICE_RULES: &[Rule] = &[Rule::Required, Rule::GreaterThan(0.0)];

/// Publish request body.
#[derive(Debug, Deserialize)]
pub struct AdDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: f64,
}

impl AdDto {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = validation::check(&[
            Field {
                name: "title",
                value: Value::Text(&self.title),
                rules: TITLE_RULES,
            },
            Field {
                name: "text",
                value: Value::Text(&self.text),
                rules: TEXT_RULES,
            },
            Field {
                name: IMAGE_URL_FIELD,
                value: Value::Text(&self.image_url),
                rules: IMAGE_URL_RULES,
            },
            Field {
                name: "price",
                value: Value::Number(self.price),
                rules: PRICE_RULES,
            },
        ]);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdResponse {
    pub title: String,
    pub text: String,
    pub image_url: String,
    pub price: f64,
    pub username: String,
    /// Only present on the authenticated listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_owner: Option<bool>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&Ad> for AdResponse {
    fn from(ad: &Ad) -> Self {
        Self {
            title: ad.title.clone(),
            text: ad.text.clone(),
            image_url: ad.image_url.clone(),
            price: ad.price,
            username: ad.author.username.clone(),
            is_owner: None,
            created_at: ad.created_at,
        }
    }
}

impl AdResponse {
    pub fn process_owner(&mut self, ad: &Ad, viewer: Uuid) {
        self.is_owner = Some(ad.author.id == viewer);
    }
}
