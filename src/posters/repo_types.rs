use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct PosterRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    /// Set when the customer linked an external image.
    pub image_url: Option<String>,
    /// Set when the image was uploaded to object storage.
    pub image_key: Option<String>,
    pub custom_text: Option<String>,
    pub file_name: Option<String>,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
