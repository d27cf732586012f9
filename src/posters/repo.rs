use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::model::PosterStatus;
use super::repo_types::PosterRow;

const POSTER_COLUMNS: &str = "id, user_id, user_email, image_url, image_key, custom_text, \
                              file_name, status, created_at, updated_at";

pub struct NewPoster<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: &'a str,
    pub image_url: Option<&'a str>,
    pub image_key: Option<&'a str>,
    pub custom_text: Option<&'a str>,
    pub file_name: Option<&'a str>,
}

pub async fn insert(db: &PgPool, poster: NewPoster<'_>) -> anyhow::Result<PosterRow> {
    sqlx::query_as::<_, PosterRow>(&format!(
        r#"
        INSERT INTO custom_posters
            (id, user_id, user_email, image_url, image_key, custom_text, file_name, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {POSTER_COLUMNS}
        "#
    ))
    .bind(poster.id)
    .bind(poster.user_id)
    .bind(poster.user_email)
    .bind(poster.image_url)
    .bind(poster.image_key)
    .bind(poster.custom_text)
    .bind(poster.file_name)
    .bind(PosterStatus::Submitted.as_str())
    .fetch_one(db)
    .await
    .context("insert custom poster")
}

pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> anyhow::Result<Option<PosterRow>> {
    sqlx::query_as::<_, PosterRow>(&format!(
        "SELECT {POSTER_COLUMNS} FROM custom_posters WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
    .context("lock custom poster")
}

pub async fn update_status_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    next: PosterStatus,
) -> anyhow::Result<PosterRow> {
    sqlx::query_as::<_, PosterRow>(&format!(
        r#"
        UPDATE custom_posters SET status = $2, updated_at = now()
         WHERE id = $1
        RETURNING {POSTER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(next.as_str())
    .fetch_one(&mut **tx)
    .await
    .context("update custom poster status")
}

/// A customer's requests, newest first.
pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PosterRow>> {
    sqlx::query_as::<_, PosterRow>(&format!(
        "SELECT {POSTER_COLUMNS} FROM custom_posters WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list custom posters by user")
}

/// Every request, optionally narrowed by status, newest first.
pub async fn list_all(db: &PgPool, status: Option<PosterStatus>) -> anyhow::Result<Vec<PosterRow>> {
    sqlx::query_as::<_, PosterRow>(&format!(
        r#"
        SELECT {POSTER_COLUMNS}
          FROM custom_posters
         WHERE ($1::text IS NULL OR status = $1)
         ORDER BY created_at DESC
        "#
    ))
    .bind(status.map(PosterStatus::as_str))
    .fetch_all(db)
    .await
    .context("list custom posters")
}
