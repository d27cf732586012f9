mod dto;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use model::{Category, Product};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::admin_routes())
}
