mod dto;
pub mod handlers;
pub mod model;
pub mod repo;
mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use model::{Order, OrderError, OrderStatus};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::customer_routes())
        .merge(handlers::admin_routes())
}
