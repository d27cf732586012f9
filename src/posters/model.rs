use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
/// Body limit for poster submissions: a base64 image at the cap plus JSON fields.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;
pub const MAX_CUSTOM_TEXT_CHARS: usize = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PosterError {
    #[error("an image is required")]
    MissingImage,
    #[error("send either image_url or image_base64, not both")]
    AmbiguousImage,
    #[error("image_url must be an http(s) URL")]
    InvalidUrl,
    #[error("image is not valid base64")]
    InvalidBase64,
    #[error("unsupported image type {0:?}")]
    UnsupportedImageType(String),
    #[error("image is larger than {0} bytes")]
    ImageTooLarge(usize),
    #[error("custom text is longer than {0} characters")]
    TextTooLong(usize),
    #[error("cannot move poster request from {from} to {to}")]
    IllegalTransition { from: PosterStatus, to: PosterStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PosterStatus {
    Submitted,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

impl PosterStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }

    pub fn can_transition_to(self, next: PosterStatus) -> bool {
        use PosterStatus::*;
        matches!(
            (self, next),
            (Submitted, InProgress) | (Submitted, Completed) | (InProgress, Completed)
        )
    }

    /// `Ok(false)` when `next` equals the current status.
    pub fn check_transition(self, next: PosterStatus) -> Result<bool, PosterError> {
        if self == next {
            return Ok(false);
        }
        if !self.can_transition_to(next) {
            return Err(PosterError::IllegalTransition { from: self, to: next });
        }
        Ok(true)
    }
}

impl fmt::Display for PosterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PosterStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submitted" => Ok(Self::Submitted),
            "In Progress" => Ok(Self::InProgress),
            "Completed" => Ok(Self::Completed),
            other => anyhow::bail!("unknown poster status {other:?}"),
        }
    }
}

/// Decoded upload ready for object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Upload(ImageUpload),
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Accepts raw base64 or a `data:<mime>;base64,<payload>` URL.
fn decode_image(raw: &str, content_type: Option<&str>) -> Result<ImageUpload, PosterError> {
    let raw = raw.trim();
    let (mime, payload) = match raw.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest.split_once(',').ok_or(PosterError::InvalidBase64)?;
            let mime = meta
                .strip_suffix(";base64")
                .ok_or(PosterError::InvalidBase64)?;
            (mime.to_ascii_lowercase(), payload)
        }
        None => (
            content_type.unwrap_or("image/jpeg").trim().to_ascii_lowercase(),
            raw,
        ),
    };

    if ext_from_mime(&mime).is_none() {
        return Err(PosterError::UnsupportedImageType(mime));
    }
    // Base64 grows data by 4/3; reject before decoding anything huge.
    if payload.len() / 4 * 3 > MAX_IMAGE_BYTES + 3 {
        return Err(PosterError::ImageTooLarge(MAX_IMAGE_BYTES));
    }
    let body = STANDARD
        .decode(payload)
        .map_err(|_| PosterError::InvalidBase64)?;
    if body.is_empty() {
        return Err(PosterError::MissingImage);
    }
    if body.len() > MAX_IMAGE_BYTES {
        return Err(PosterError::ImageTooLarge(MAX_IMAGE_BYTES));
    }
    Ok(ImageUpload {
        body: Bytes::from(body),
        content_type: mime,
    })
}

impl ImageSource {
    pub fn from_parts(
        image_url: Option<&str>,
        image_base64: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Self, PosterError> {
        let url = image_url.map(str::trim).filter(|s| !s.is_empty());
        let data = image_base64.map(str::trim).filter(|s| !s.is_empty());
        match (url, data) {
            (Some(_), Some(_)) => Err(PosterError::AmbiguousImage),
            (None, None) => Err(PosterError::MissingImage),
            (Some(url), None) => {
                if url.starts_with("https://") || url.starts_with("http://") {
                    Ok(Self::Url(url.to_string()))
                } else {
                    Err(PosterError::InvalidUrl)
                }
            }
            (None, Some(data)) => decode_image(data, content_type).map(Self::Upload),
        }
    }
}

pub fn validate_custom_text(text: Option<&str>) -> Result<Option<String>, PosterError> {
    match text.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(t) if t.chars().count() > MAX_CUSTOM_TEXT_CHARS => {
            Err(PosterError::TextTooLong(MAX_CUSTOM_TEXT_CHARS))
        }
        Some(t) => Ok(Some(t.to_string())),
    }
}

/// Poster request as returned to clients; `image_url` is already resolved (presigned
/// for uploads).
#[derive(Debug, Clone, Serialize)]
pub struct CustomPoster {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub image_url: String,
    pub custom_text: Option<String>,
    pub file_name: Option<String>,
    pub status: PosterStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_B64: &str = "iVBORw0KGgo=";

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn accepts_data_url_upload() {
        let src = ImageSource::from_parts(None, Some(format!("data:image/png;base64,{PNG_B64}").as_str()), None)
            .unwrap();
        let ImageSource::Upload(up) = src else {
            panic!("expected upload");
        };
        assert_eq!(up.content_type, "image/png");
        assert_eq!(&up.body[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn raw_base64_uses_declared_or_default_type() {
        let ImageSource::Upload(up) =
            ImageSource::from_parts(None, Some(PNG_B64), Some("IMAGE/PNG")).unwrap()
        else {
            panic!("expected upload");
        };
        assert_eq!(up.content_type, "image/png");

        let ImageSource::Upload(up) = ImageSource::from_parts(None, Some(PNG_B64), None).unwrap()
        else {
            panic!("expected upload");
        };
        assert_eq!(up.content_type, "image/jpeg");
    }

    #[test]
    fn rejects_bad_image_inputs() {
        assert_eq!(ImageSource::from_parts(None, None, None), Err(PosterError::MissingImage));
        assert_eq!(
            ImageSource::from_parts(Some(" "), Some(""), None),
            Err(PosterError::MissingImage)
        );
        assert_eq!(
            ImageSource::from_parts(Some("https://x.io/a.jpg"), Some(PNG_B64), None),
            Err(PosterError::AmbiguousImage)
        );
        assert_eq!(
            ImageSource::from_parts(Some("ftp://x.io/a.jpg"), None, None),
            Err(PosterError::InvalidUrl)
        );
        assert_eq!(
            ImageSource::from_parts(None, Some("not base64!!"), None),
            Err(PosterError::InvalidBase64)
        );
        assert_eq!(
            ImageSource::from_parts(None, Some("data:text/plain;base64,aGk="), None),
            Err(PosterError::UnsupportedImageType("text/plain".into()))
        );
        assert_eq!(
            ImageSource::from_parts(None, Some("data:image/png,rawbytes"), None),
            Err(PosterError::InvalidBase64)
        );
    }

    #[test]
    fn rejects_oversized_payload_before_decoding() {
        let huge = "A".repeat(MAX_IMAGE_BYTES / 3 * 4 + 64);
        assert_eq!(
            ImageSource::from_parts(None, Some(huge.as_str()), None),
            Err(PosterError::ImageTooLarge(MAX_IMAGE_BYTES))
        );
    }

    #[test]
    fn accepts_multi_megabyte_upload() {
        let payload = format!("data:image/jpeg;base64,{}", "A".repeat(4 * 1024 * 1024));
        let ImageSource::Upload(up) =
            ImageSource::from_parts(None, Some(payload.as_str()), None).unwrap()
        else {
            panic!("expected upload");
        };
        assert_eq!(up.body.len(), 3 * 1024 * 1024);
        assert_eq!(up.content_type, "image/jpeg");
    }

    #[test]
    fn url_source_is_kept_verbatim() {
        assert_eq!(
            ImageSource::from_parts(Some(" https://img.local/me.jpg "), None, None).unwrap(),
            ImageSource::Url("https://img.local/me.jpg".into())
        );
    }

    #[test]
    fn custom_text_bounds() {
        assert_eq!(validate_custom_text(None), Ok(None));
        assert_eq!(validate_custom_text(Some("  ")), Ok(None));
        assert_eq!(validate_custom_text(Some(" Happy 30th ")), Ok(Some("Happy 30th".into())));
        let long = "x".repeat(MAX_CUSTOM_TEXT_CHARS + 1);
        assert_eq!(
            validate_custom_text(Some(long.as_str())),
            Err(PosterError::TextTooLong(MAX_CUSTOM_TEXT_CHARS))
        );
    }

    #[test]
    fn poster_status_flow() {
        use PosterStatus::*;
        assert!(Submitted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Submitted.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Submitted));
        assert_eq!(InProgress.check_transition(InProgress), Ok(false));
        assert_eq!(serde_json::to_string(&InProgress).unwrap(), r#""In Progress""#);
        assert_eq!("In Progress".parse::<PosterStatus>().unwrap(), InProgress);
    }
}
