use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::{Category, Product, ProductInput, ProductRow};

const PRODUCT_COLUMNS: &str = "id, name, category, price, description, images, sizes, \
                               frame_types, stock, featured, created_at, updated_at";

fn into_products(rows: Vec<ProductRow>) -> anyhow::Result<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// All products, optionally narrowed to one category, oldest first.
pub async fn list(db: &PgPool, category: Option<Category>) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        r#"
        SELECT {PRODUCT_COLUMNS}
          FROM products
         WHERE ($1::text IS NULL OR category = $1)
         ORDER BY created_at ASC, id ASC
        "#
    ))
    .bind(category.map(|c| c.as_str()))
    .fetch_all(db)
    .await
    .context("list products")?;
    into_products(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get product")?;
    row.map(Product::try_from).transpose()
}

pub async fn get_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
    ))
    .bind(ids)
    .fetch_all(db)
    .await
    .context("get products by id")?;
    into_products(rows)
}

/// Locks the given product rows until the transaction ends.
pub async fn lock_many_tx(
    tx: &mut Transaction<'_, Postgres>,
    ids: &[Uuid],
) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut **tx)
    .await
    .context("lock products")?;
    into_products(rows)
}

/// Adds `delta` (negative to reserve) to a product's stock.
pub async fn adjust_stock_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    delta: i32,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(delta)
        .execute(&mut **tx)
        .await
        .context("adjust stock")?;
    Ok(())
}

pub async fn create(db: &PgPool, input: &ProductInput) -> anyhow::Result<Product> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r#"
        INSERT INTO products
            (name, category, price, description, images, sizes, frame_types, stock, featured)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&input.name)
    .bind(input.category.as_str())
    .bind(input.price)
    .bind(&input.description)
    .bind(&input.images)
    .bind(&input.sizes)
    .bind(&input.frame_types)
    .bind(input.stock)
    .bind(input.featured)
    .fetch_one(db)
    .await
    .context("insert product")?;
    Product::try_from(row)
}

pub async fn update(db: &PgPool, id: Uuid, input: &ProductInput) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        r#"
        UPDATE products
           SET name = $2, category = $3, price = $4, description = $5, images = $6,
               sizes = $7, frame_types = $8, stock = $9, featured = $10, updated_at = now()
         WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&input.name)
    .bind(input.category.as_str())
    .bind(input.price)
    .bind(&input.description)
    .bind(&input.images)
    .bind(&input.sizes)
    .bind(&input.frame_types)
    .bind(input.stock)
    .bind(input.featured)
    .fetch_optional(db)
    .await
    .context("update product")?;
    row.map(Product::try_from).transpose()
}

/// Returns whether a row was deleted.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete product")?;
    Ok(res.rows_affected() > 0)
}
