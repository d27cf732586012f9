use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    model::{ext_from_mime, CustomPoster, ImageSource, ImageUpload, PosterStatus},
    repo::{self, NewPoster},
    repo_types::PosterRow,
};
use crate::{
    auth::repo_types::User,
    error::{AppError, Result},
    state::AppState,
    storage::StorageClient,
};

/// Validated request body, ready to persist.
#[derive(Debug)]
pub struct PosterSubmission {
    pub image: ImageSource,
    pub custom_text: Option<String>,
    pub file_name: Option<String>,
}

pub(crate) fn object_key(user_id: Uuid, poster_id: Uuid, content_type: &str) -> String {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("posters/{user_id}/{poster_id}.{ext}")
}

pub(crate) async fn store_upload(
    storage: &dyn StorageClient,
    user_id: Uuid,
    poster_id: Uuid,
    upload: ImageUpload,
) -> anyhow::Result<String> {
    let key = object_key(user_id, poster_id, &upload.content_type);
    storage
        .put_object(&key, upload.body, &upload.content_type)
        .await
        .with_context(|| format!("put_object {key}"))?;
    Ok(key)
}

/// Resolves the image reference clients see. Uploaded images get a time-limited URL.
pub(crate) async fn present(
    storage: &dyn StorageClient,
    ttl_seconds: u64,
    row: PosterRow,
) -> anyhow::Result<CustomPoster> {
    let image_url = match (row.image_key.as_deref(), row.image_url) {
        (Some(key), _) => storage
            .presign_get(key, ttl_seconds)
            .await
            .with_context(|| format!("presign url for {key}"))?,
        (None, Some(url)) => url,
        (None, None) => anyhow::bail!("custom poster {} has no image", row.id),
    };
    Ok(CustomPoster {
        id: row.id,
        user_id: row.user_id,
        user_email: row.user_email,
        image_url,
        custom_text: row.custom_text,
        file_name: row.file_name,
        status: row.status.parse()?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

pub async fn present_many(state: &AppState, rows: Vec<PosterRow>) -> Result<Vec<CustomPoster>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(present(state.storage.as_ref(), state.config.presign_ttl_seconds, row).await?);
    }
    Ok(out)
}

/// Stores the artwork (if uploaded) and records the request as `Submitted`.
pub async fn submit(
    state: &AppState,
    user_id: Uuid,
    submission: PosterSubmission,
) -> Result<CustomPoster> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let poster_id = Uuid::new_v4();
    let (image_url, image_key) = match submission.image {
        ImageSource::Url(url) => (Some(url), None),
        ImageSource::Upload(upload) => {
            let key = store_upload(state.storage.as_ref(), user_id, poster_id, upload).await?;
            (None, Some(key))
        }
    };

    let inserted = repo::insert(
        &state.db,
        NewPoster {
            id: poster_id,
            user_id,
            user_email: &user.email,
            image_url: image_url.as_deref(),
            image_key: image_key.as_deref(),
            custom_text: submission.custom_text.as_deref(),
            file_name: submission.file_name.as_deref(),
        },
    )
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            if let Some(key) = &image_key {
                if let Err(cleanup) = state.storage.delete_object(key).await {
                    warn!(%key, error = %cleanup, "orphaned poster upload");
                }
            }
            return Err(e.into());
        }
    };

    info!(%user_id, %poster_id, uploaded = image_key.is_some(), "custom poster submitted");
    Ok(present(state.storage.as_ref(), state.config.presign_ttl_seconds, row).await?)
}

pub async fn change_status(
    state: &AppState,
    admin_id: Uuid,
    poster_id: Uuid,
    next: PosterStatus,
) -> Result<CustomPoster> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let row = repo::lock_tx(&mut tx, poster_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Custom poster not found".into()))?;
    let current: PosterStatus = row.status.parse()?;

    let row = if current.check_transition(next)? {
        let updated = repo::update_status_tx(&mut tx, poster_id, next).await?;
        tx.commit().await.context("commit tx")?;
        info!(%admin_id, %poster_id, from = %current, to = %next, "custom poster status changed");
        updated
    } else {
        tx.rollback().await.context("rollback tx")?;
        row
    };
    Ok(present(state.storage.as_ref(), state.config.presign_ttl_seconds, row).await?)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use time::OffsetDateTime;

    use super::*;
    use crate::storage::MemoryStorage;

    fn row(image_url: Option<&str>, image_key: Option<&str>) -> PosterRow {
        PosterRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_email: "asha@example.com".into(),
            image_url: image_url.map(Into::into),
            image_key: image_key.map(Into::into),
            custom_text: Some("For Dad".into()),
            file_name: Some("dad.png".into()),
            status: "In Progress".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn object_keys_are_scoped_per_user() {
        let user = Uuid::nil();
        let poster = Uuid::from_u128(7);
        assert_eq!(
            object_key(user, poster, "image/png"),
            format!("posters/{user}/{poster}.png")
        );
        assert!(object_key(user, poster, "image/x-unknown").ends_with(".bin"));
    }

    #[tokio::test]
    async fn store_upload_writes_object() {
        let storage = MemoryStorage::default();
        let user = Uuid::new_v4();
        let poster = Uuid::new_v4();
        let key = store_upload(
            &storage,
            user,
            poster,
            ImageUpload {
                body: Bytes::from_static(b"\x89PNG"),
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap();

        let objects = storage.objects.lock().unwrap();
        let (body, ct) = objects.get(&key).expect("stored");
        assert_eq!(&body[..], b"\x89PNG");
        assert_eq!(ct, "image/png");
    }

    #[tokio::test]
    async fn present_presigns_uploaded_images() {
        let storage = MemoryStorage::default();
        let poster = present(&storage, 600, row(None, Some("posters/u/p.png")))
            .await
            .unwrap();
        assert_eq!(poster.image_url, "https://fake.local/posters/u/p.png");
        assert_eq!(poster.status, PosterStatus::InProgress);

        let linked = present(&storage, 600, row(Some("https://img.local/a.jpg"), None))
            .await
            .unwrap();
        assert_eq!(linked.image_url, "https://img.local/a.jpg");
    }

    #[tokio::test]
    async fn present_rejects_rows_without_image() {
        let storage = MemoryStorage::default();
        assert!(present(&storage, 600, row(None, None)).await.is_err());
    }
}
