use serde::Deserialize;

use super::{
    model::{validate_custom_text, ImageSource, PosterError, PosterStatus},
    services::PosterSubmission,
};

const MAX_FILE_NAME_CHARS: usize = 255;

#[derive(Debug, Deserialize)]
pub struct CreatePosterRequest {
    pub image_url: Option<String>,
    /// Raw base64 or a `data:` URL.
    pub image_base64: Option<String>,
    pub content_type: Option<String>,
    pub custom_text: Option<String>,
    pub file_name: Option<String>,
}

impl CreatePosterRequest {
    pub fn validate(self) -> Result<PosterSubmission, PosterError> {
        let image = ImageSource::from_parts(
            self.image_url.as_deref(),
            self.image_base64.as_deref(),
            self.content_type.as_deref(),
        )?;
        let custom_text = validate_custom_text(self.custom_text.as_deref())?;
        let file_name = self
            .file_name
            .map(|n| n.trim().chars().take(MAX_FILE_NAME_CHARS).collect::<String>())
            .filter(|n| !n.is_empty());
        Ok(PosterSubmission {
            image,
            custom_text,
            file_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePosterStatusRequest {
    pub status: PosterStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminPostersQuery {
    pub status: Option<PosterStatus>,
}
