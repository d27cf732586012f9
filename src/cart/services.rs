use std::collections::HashMap;

use anyhow::Context;
use uuid::Uuid;

use super::{
    dto::CartView,
    model::{Cart, CartError},
    repo,
};
use crate::{
    catalog::{self, Product},
    error::{AppError, Result},
    state::AppState,
};

/// Runs `op` against the caller's cart inside one transaction and persists the result.
pub async fn mutate<T>(
    state: &AppState,
    user_id: Uuid,
    op: impl FnOnce(&mut Cart) -> std::result::Result<T, CartError>,
) -> Result<(Cart, T)> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    if !repo::lock_tx(&mut tx, user_id).await? {
        return Err(AppError::Unauthorized("User not found".into()));
    }
    let mut cart = repo::load_tx(&mut tx, user_id).await?;
    let out = op(&mut cart)?;
    repo::replace_tx(&mut tx, user_id, &cart).await?;
    tx.commit().await.context("commit tx")?;
    Ok((cart, out))
}

pub async fn products_for(state: &AppState, cart: &Cart) -> Result<HashMap<Uuid, Product>> {
    let mut ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products = catalog::repo::get_many(&state.db, &ids).await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

pub async fn view(state: &AppState, cart: &Cart) -> Result<CartView> {
    let products = products_for(state, cart).await?;
    Ok(CartView::build(cart, &products))
}
