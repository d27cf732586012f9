use std::collections::HashMap;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    model::{
        generate_reference, plan_checkout, restock_deltas, Contact, Order, OrderError,
        OrderStatus,
    },
    repo::{self, NewOrder},
};
use crate::{
    auth::AuthUser,
    cart::{self, Cart},
    catalog,
    error::{AppError, Result},
    state::AppState,
};

/// Turns the caller's cart into an order: prices it from locked product rows,
/// reserves stock and empties the cart, all in one transaction.
pub async fn checkout(state: &AppState, user_id: Uuid, contact: Contact) -> Result<Order> {
    let mut tx = state.db.begin().await.context("begin tx")?;

    if !cart::repo::lock_tx(&mut tx, user_id).await? {
        return Err(AppError::Unauthorized("User not found".into()));
    }
    let cart = cart::repo::load_tx(&mut tx, user_id).await?;
    if cart.is_empty() {
        return Err(OrderError::EmptyCart.into());
    }

    let mut ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
    ids.sort();
    ids.dedup();
    let products: HashMap<Uuid, catalog::Product> = catalog::repo::lock_many_tx(&mut tx, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let plan = plan_checkout(cart.items(), &products)?;
    for &(product_id, delta) in &plan.stock_deltas {
        catalog::repo::adjust_stock_tx(&mut tx, product_id, delta).await?;
    }

    let order_id = Uuid::new_v4();
    let reference = generate_reference(&mut rand::thread_rng());
    let (lines, total) = (plan.lines, plan.total);
    let row = repo::insert_order_tx(
        &mut tx,
        NewOrder {
            id: order_id,
            reference: &reference,
            user_id,
            total,
            contact: &contact,
        },
    )
    .await?;
    repo::insert_lines_tx(&mut tx, order_id, &lines).await?;
    cart::repo::replace_tx(&mut tx, user_id, &Cart::default()).await?;
    tx.commit().await.context("commit tx")?;

    info!(%user_id, %order_id, %reference, total, lines = lines.len(), "order placed");
    Ok(row.into_order(lines, Vec::new())?)
}

/// Applies a validated status change. Cancelling returns the reserved stock.
pub async fn change_status(
    state: &AppState,
    admin_id: Uuid,
    order_id: Uuid,
    next: OrderStatus,
) -> Result<Order> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let row = repo::lock_row_tx(&mut tx, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let current: OrderStatus = row.status.parse()?;

    if !current.check_transition(next)? {
        tx.rollback().await.context("rollback tx")?;
        return repo::get(&state.db, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".into()));
    }

    let lines = repo::lines_tx(&mut tx, order_id).await?;
    if next == OrderStatus::Cancelled {
        // Lock in id order first, the same order checkout uses.
        let restock = restock_deltas(&lines);
        let ids: Vec<Uuid> = restock.iter().map(|(id, _)| *id).collect();
        catalog::repo::lock_many_tx(&mut tx, &ids).await?;
        for (product_id, delta) in restock {
            catalog::repo::adjust_stock_tx(&mut tx, product_id, delta).await?;
        }
    }

    let Some(updated) = repo::update_status_tx(&mut tx, order_id, current, next).await? else {
        warn!(%order_id, %current, %next, "status changed concurrently");
        return Err(AppError::Conflict("Order status changed concurrently".into()));
    };
    tx.commit().await.context("commit tx")?;

    info!(%admin_id, %order_id, from = %current, to = %next, "order status changed");
    let messages = repo::list_messages(&state.db, order_id).await?;
    Ok(updated.into_order(lines, messages)?)
}

/// Loads an order header and checks the caller may see it. Customers get a 404 for
/// orders that are not theirs.
pub async fn authorize(state: &AppState, auth: &AuthUser, order_id: Uuid) -> Result<()> {
    let row = repo::get_row(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    if !auth.is_admin() && row.user_id != auth.id {
        warn!(user_id = %auth.id, %order_id, "order access denied");
        return Err(AppError::NotFound("Order not found".into()));
    }
    Ok(())
}
