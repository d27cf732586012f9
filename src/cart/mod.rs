mod dto;
pub mod handlers;
pub mod model;
pub mod repo;
mod services;

use crate::state::AppState;
use axum::Router;

pub use model::{Cart, CartError, CartItem};

pub fn router() -> Router<AppState> {
    handlers::cart_routes()
}
