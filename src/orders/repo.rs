use std::collections::HashMap;

use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::{Contact, Message, Order, OrderLine, OrderStatus};
use super::repo_types::{MessageRow, OrderLineRow, OrderRow};

const ORDER_COLUMNS: &str =
    "id, reference, user_id, total, status, address, phone, created_at, updated_at";
const LINE_COLUMNS: &str =
    "order_id, product_id, product_name, image, unit_price, quantity, size, frame_type";
const MESSAGE_COLUMNS: &str = "id, order_id, sender_id, text, is_admin, created_at";

pub struct NewOrder<'a> {
    pub id: Uuid,
    pub reference: &'a str,
    pub user_id: Uuid,
    pub total: i64,
    pub contact: &'a Contact,
}

pub async fn insert_order_tx(
    tx: &mut Transaction<'_, Postgres>,
    order: NewOrder<'_>,
) -> anyhow::Result<OrderRow> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r#"
        INSERT INTO orders (id, reference, user_id, total, status, address, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order.id)
    .bind(order.reference)
    .bind(order.user_id)
    .bind(order.total)
    .bind(OrderStatus::Placed.as_str())
    .bind(&order.contact.address)
    .bind(&order.contact.phone)
    .fetch_one(&mut **tx)
    .await
    .context("insert order")?;
    Ok(row)
}

pub async fn insert_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    lines: &[OrderLine],
) -> anyhow::Result<()> {
    let positions: Vec<i32> = (0..lines.len() as i32).collect();
    let product_ids: Vec<Option<Uuid>> = lines.iter().map(|l| l.product_id).collect();
    let names: Vec<String> = lines.iter().map(|l| l.product_name.clone()).collect();
    let images: Vec<Option<String>> = lines.iter().map(|l| l.image.clone()).collect();
    let prices: Vec<i64> = lines.iter().map(|l| l.unit_price).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
    let sizes: Vec<String> = lines.iter().map(|l| l.size.clone()).collect();
    let frames: Vec<String> = lines.iter().map(|l| l.frame_type.clone()).collect();

    sqlx::query(
        r#"
        INSERT INTO order_items
            (order_id, position, product_id, product_name, image, unit_price, quantity,
             size, frame_type)
        SELECT $1, * FROM UNNEST($2::int4[], $3::uuid[], $4::text[], $5::text[], $6::int8[],
                                 $7::int4[], $8::text[], $9::text[])
        "#,
    )
    .bind(order_id)
    .bind(&positions)
    .bind(&product_ids)
    .bind(&names)
    .bind(&images)
    .bind(&prices)
    .bind(&quantities)
    .bind(&sizes)
    .bind(&frames)
    .execute(&mut **tx)
    .await
    .context("insert order items")?;
    Ok(())
}

/// Order header only, for access checks.
pub async fn get_row(db: &PgPool, id: Uuid) -> anyhow::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get order")
}

pub async fn lock_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock order")
}

/// Writes `next` only if the order is still in `observed`. Returns the updated row,
/// or `None` when another writer got there first.
pub async fn update_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    observed: OrderStatus,
    next: OrderStatus,
) -> anyhow::Result<Option<OrderRow>> {
    sqlx::query_as::<_, OrderRow>(&format!(
        r#"
        UPDATE orders SET status = $3, updated_at = now()
         WHERE id = $1 AND status = $2
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(observed.as_str())
    .bind(next.as_str())
    .fetch_optional(&mut **tx)
    .await
    .context("update order status")
}

pub async fn lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> anyhow::Result<Vec<OrderLine>> {
    let rows = sqlx::query_as::<_, OrderLineRow>(&format!(
        "SELECT {LINE_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY position"
    ))
    .bind(order_id)
    .fetch_all(&mut **tx)
    .await
    .context("load order items")?;
    Ok(rows.into_iter().map(OrderLine::from).collect())
}

/// Loads lines and messages for the given headers and assembles full orders,
/// keeping the header order.
async fn assemble(db: &PgPool, rows: Vec<OrderRow>) -> anyhow::Result<Vec<Order>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let line_rows = sqlx::query_as::<_, OrderLineRow>(&format!(
        "SELECT {LINE_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position"
    ))
    .bind(&ids)
    .fetch_all(db)
    .await
    .context("load order items")?;

    let message_rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM order_messages WHERE order_id = ANY($1) ORDER BY seq"
    ))
    .bind(&ids)
    .fetch_all(db)
    .await
    .context("load order messages")?;

    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for r in line_rows {
        lines.entry(r.order_id).or_default().push(r.into());
    }
    let mut messages: HashMap<Uuid, Vec<Message>> = HashMap::new();
    for r in message_rows {
        messages.entry(r.order_id).or_default().push(r.into());
    }

    rows.into_iter()
        .map(|row| {
            let items = lines.remove(&row.id).unwrap_or_default();
            let msgs = messages.remove(&row.id).unwrap_or_default();
            row.into_order(items, msgs)
        })
        .collect()
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Order>> {
    let Some(row) = get_row(db, id).await? else {
        return Ok(None);
    };
    Ok(assemble(db, vec![row]).await?.pop())
}

/// A customer's orders, newest first.
pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list orders by user")?;
    assemble(db, rows).await
}

/// Every order, optionally narrowed by status, newest first.
pub async fn list_all(db: &PgPool, status: Option<OrderStatus>) -> anyhow::Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        r#"
        SELECT {ORDER_COLUMNS}
          FROM orders
         WHERE ($1::text IS NULL OR status = $1)
         ORDER BY created_at DESC
        "#
    ))
    .bind(status.map(OrderStatus::as_str))
    .fetch_all(db)
    .await
    .context("list orders")?;
    assemble(db, rows).await
}

pub async fn insert_message(
    db: &PgPool,
    order_id: Uuid,
    sender_id: Uuid,
    text: &str,
    is_admin: bool,
) -> anyhow::Result<Message> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        r#"
        INSERT INTO order_messages (order_id, sender_id, text, is_admin)
        VALUES ($1, $2, $3, $4)
        RETURNING {MESSAGE_COLUMNS}
        "#
    ))
    .bind(order_id)
    .bind(sender_id)
    .bind(text)
    .bind(is_admin)
    .fetch_one(db)
    .await
    .context("insert order message")?;
    Ok(row.into())
}

pub async fn list_messages(db: &PgPool, order_id: Uuid) -> anyhow::Result<Vec<Message>> {
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM order_messages WHERE order_id = $1 ORDER BY seq"
    ))
    .bind(order_id)
    .fetch_all(db)
    .await
    .context("list order messages")?;
    Ok(rows.into_iter().map(Message::from).collect())
}
