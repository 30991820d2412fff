mod ads;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod images;
mod state;
mod validation;

use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, state::AppState};

const DEFAULT_LOG_FILTER: &str = "marketplace=debug,axum=info,tower_http=info";

/// `RUST_LOG` picks the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let state = AppState::init(&config).await?;
    let app = app::build_app(state);

    app::serve(app, &config.host, config.port).await
}
