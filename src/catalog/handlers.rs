use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::ProductQuery,
    filter,
    model::{Product, ProductInput},
    repo,
};
use crate::{
    auth::AdminUser,
    error::{AppError, Result},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/products", post(create_product))
        .route(
            "/admin/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let (filter, sort) = q.into_parts();
    let products = repo::list(&state.db, filter.category).await?;
    Ok(Json(filter::apply(products, &filter, sort)))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Product not found".into()))
}

#[instrument(skip(state, input))]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, HeaderMap, Json<Product>)> {
    let input = input.normalized().map_err(AppError::BadRequest)?;
    let product = repo::create(&state.db, &input).await?;
    info!(%admin_id, product_id = %product.id, name = %product.name, "product created");

    let mut headers = HeaderMap::new();
    if let Ok(v) = format!("/api/products/{}", product.id).parse() {
        headers.insert(header::LOCATION, v);
    }
    Ok((StatusCode::CREATED, headers, Json(product)))
}

#[instrument(skip(state, input))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let input = input.normalized().map_err(AppError::BadRequest)?;
    let product = repo::update(&state.db, id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    info!(%admin_id, product_id = %id, "product updated");
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Product not found".into()));
    }
    info!(%admin_id, product_id = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
