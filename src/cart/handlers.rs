use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::{AddCartItemRequest, CartView, UpdateQuantityRequest},
    model::{CartError, CartItem, MAX_LINE_QUANTITY},
    repo, services,
};
use crate::{
    auth::AuthUser,
    catalog,
    error::{AppError, Result},
    state::AppState,
};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:index", patch(update_quantity).delete(remove_item))
}

#[instrument(skip(state))]
pub async fn get_cart(State(state): State<AppState>, auth: AuthUser) -> Result<Json<CartView>> {
    let cart = repo::load(&state.db, auth.id).await?;
    Ok(Json(services::view(&state, &cart).await?))
}

#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AddCartItemRequest>,
) -> Result<Json<CartView>> {
    if !(1..=MAX_LINE_QUANTITY).contains(&body.quantity) {
        return Err(CartError::InvalidQuantity(body.quantity).into());
    }
    let item = CartItem {
        product_id: body.product_id,
        quantity: body.quantity,
        size: body.size.trim().to_string(),
        frame_type: body.frame_type.trim().to_string(),
    };

    let product = catalog::repo::get(&state.db, item.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    if !product.offers(&item.size, &item.frame_type) {
        return Err(CartError::OptionNotOffered {
            size: item.size,
            frame_type: item.frame_type,
        }
        .into());
    }

    let (cart, index) = services::mutate(&state, auth.id, |cart| cart.add(item)).await?;
    info!(user_id = %auth.id, product_id = %product.id, index, "cart line added");
    Ok(Json(services::view(&state, &cart).await?))
}

#[instrument(skip(state))]
pub async fn update_quantity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(index): Path<usize>,
    Json(body): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>> {
    let (cart, quantity) =
        services::mutate(&state, auth.id, |cart| cart.update_qty(index, body.delta)).await?;
    info!(user_id = %auth.id, index, quantity, "cart quantity updated");
    Ok(Json(services::view(&state, &cart).await?))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(index): Path<usize>,
) -> Result<Json<CartView>> {
    let (cart, removed) = services::mutate(&state, auth.id, |cart| cart.remove(index)).await?;
    info!(user_id = %auth.id, product_id = %removed.product_id, "cart line removed");
    Ok(Json(services::view(&state, &cart).await?))
}

#[instrument(skip(state))]
pub async fn clear_cart(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode> {
    services::mutate(&state, auth.id, |cart| {
        cart.clear();
        Ok(())
    })
    .await?;
    info!(user_id = %auth.id, "cart cleared");
    Ok(StatusCode::NO_CONTENT)
}
