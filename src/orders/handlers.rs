use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{AdminOrdersQuery, CheckoutRequest, PostMessageRequest, UpdateStatusRequest},
    model::{validate_message_text, Contact, Message, Order},
    repo, services,
};
use crate::{
    auth::{AdminUser, AuthUser},
    error::{AppError, Result},
    state::AppState,
};

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/me", get(my_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/messages", get(list_messages).post(post_message))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(all_orders))
        .route("/admin/orders/:id/status", put(update_status))
}

#[instrument(skip(state, body))]
pub async fn place_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<(StatusCode, HeaderMap, Json<Order>)> {
    let contact = Contact::parse(&body.address, &body.phone)?;
    let order = services::checkout(&state, auth.id, contact).await?;

    let mut headers = HeaderMap::new();
    if let Ok(v) = format!("/api/orders/{}", order.id).parse() {
        headers.insert(header::LOCATION, v);
    }
    Ok((StatusCode::CREATED, headers, Json(order)))
}

#[instrument(skip(state))]
pub async fn my_orders(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(repo::list_by_user(&state.db, auth.id).await?))
}

#[instrument(skip(state))]
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    services::authorize(&state, &auth, id).await?;
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Message>>> {
    services::authorize(&state, &auth, id).await?;
    Ok(Json(repo::list_messages(&state.db, id).await?))
}

#[instrument(skip(state, body))]
pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let text = validate_message_text(&body.text)?;
    services::authorize(&state, &auth, id).await?;
    let message = repo::insert_message(&state.db, id, auth.id, &text, auth.is_admin()).await?;
    info!(order_id = %id, sender_id = %auth.id, is_admin = auth.is_admin(), "order message posted");
    Ok((StatusCode::CREATED, Json(message)))
}

#[instrument(skip(state))]
pub async fn all_orders(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<AdminOrdersQuery>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(repo::list_all(&state.db, q.status).await?))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    Ok(Json(services::change_status(&state, admin_id, id, body.status).await?))
}
