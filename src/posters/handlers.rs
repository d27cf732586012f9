use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AdminPostersQuery, CreatePosterRequest, UpdatePosterStatusRequest},
    model::{CustomPoster, MAX_REQUEST_BYTES},
    repo, services,
};
use crate::{
    auth::{AdminUser, AuthUser},
    error::Result,
    state::AppState,
};

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/custom-posters", post(create_poster))
        .route("/custom-poster", post(create_poster))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
        .route("/custom-posters/me", get(my_posters))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/custom-posters", get(all_posters))
        .route("/admin/custom-posters/:id/status", put(update_status))
}

#[instrument(skip(state, body))]
pub async fn create_poster(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePosterRequest>,
) -> Result<(StatusCode, Json<CustomPoster>)> {
    let submission = body.validate()?;
    let poster = services::submit(&state, auth.id, submission).await?;
    Ok((StatusCode::CREATED, Json(poster)))
}

#[instrument(skip(state))]
pub async fn my_posters(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<CustomPoster>>> {
    let rows = repo::list_by_user(&state.db, auth.id).await?;
    Ok(Json(services::present_many(&state, rows).await?))
}

#[instrument(skip(state))]
pub async fn all_posters(
    State(state): State<AppState>,
    AdminUser(_admin_id): AdminUser,
    Query(q): Query<AdminPostersQuery>,
) -> Result<Json<Vec<CustomPoster>>> {
    let rows = repo::list_all(&state.db, q.status).await?;
    Ok(Json(services::present_many(&state, rows).await?))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePosterStatusRequest>,
) -> Result<Json<CustomPoster>> {
    Ok(Json(services::change_status(&state, admin_id, id, body.status).await?))
}
