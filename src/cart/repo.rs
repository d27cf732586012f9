use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::{Cart, CartItem};

const SELECT_CART: &str = r#"
    SELECT product_id, quantity, size, frame_type
      FROM cart_items
     WHERE user_id = $1
     ORDER BY position ASC
"#;

pub async fn load(db: &PgPool, user_id: Uuid) -> anyhow::Result<Cart> {
    let items = sqlx::query_as::<_, CartItem>(SELECT_CART)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("load cart")?;
    Ok(Cart::new(items))
}

/// Serializes cart writes per user by locking the owning user row. Returns false if
/// the user does not exist.
pub async fn lock_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> anyhow::Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .context("lock cart owner")?;
    Ok(row.is_some())
}

pub async fn load_tx(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> anyhow::Result<Cart> {
    let items = sqlx::query_as::<_, CartItem>(SELECT_CART)
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
        .context("load cart")?;
    Ok(Cart::new(items))
}

/// Rewrites the user's cart lines, keeping their order.
pub async fn replace_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    cart: &Cart,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .context("clear cart")?;

    if cart.is_empty() {
        return Ok(());
    }

    let items = cart.items();
    let positions: Vec<i32> = (0..items.len() as i32).collect();
    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let quantities: Vec<i32> = items.iter().map(|i| i.quantity).collect();
    let sizes: Vec<String> = items.iter().map(|i| i.size.clone()).collect();
    let frames: Vec<String> = items.iter().map(|i| i.frame_type.clone()).collect();

    sqlx::query(
        r#"
        INSERT INTO cart_items (user_id, position, product_id, quantity, size, frame_type)
        SELECT $1, * FROM UNNEST($2::int4[], $3::uuid[], $4::int4[], $5::text[], $6::text[])
        "#,
    )
    .bind(user_id)
    .bind(&positions)
    .bind(&product_ids)
    .bind(&quantities)
    .bind(&sizes)
    .bind(&frames)
    .execute(&mut **tx)
    .await
    .context("insert cart lines")?;
    Ok(())
}
