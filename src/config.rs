use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_seconds: u64,
}

impl JwtConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Limits for fetching a published ad's image URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    pub fetch_timeout_secs: u64,
    pub max_bytes: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub images: ImageConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = lookup("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() {
            bail!("JWT_SECRET must be set");
        }
        let ttl_seconds = parse_or(&lookup, "JWT_TTL", 3600u64)?;

        let defaults = ImageConfig::default();
        let images = ImageConfig {
            fetch_timeout_secs: parse_or(
                &lookup,
                "IMAGE_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            )?,
            max_bytes: parse_or(&lookup, "IMAGE_MAX_BYTES", defaults.max_bytes)?,
        };

        Ok(Self {
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10u32)?,
            jwt: JwtConfig {
                secret,
                ttl_seconds,
            },
            images,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080u16)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
