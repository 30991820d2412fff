use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod options;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::ad_routes(state)
}
