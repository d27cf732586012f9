//! Request-level error type.
//!
//! Handlers return `Result<T, AppError>`; server-side failures are logged here and
//! answered with a generic message so no internals reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cart::CartError;
use crate::orders::OrderError;
use crate::posters::PosterError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            Self::NotFound(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m)
            | Self::Conflict(m) => m.clone(),
        };
        (status, message).into_response()
    }
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::LineNotFound(_) => Self::NotFound(e.to_string()),
            CartError::InvalidQuantity(_)
            | CartError::LineLimit
            | CartError::OptionNotOffered { .. } => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyCart
            | OrderError::InvalidAddress
            | OrderError::InvalidPhone
            | OrderError::EmptyMessage
            | OrderError::MessageTooLong(_)
            | OrderError::TotalTooLarge
            | OrderError::Cart(_) => Self::BadRequest(e.to_string()),
            OrderError::ProductUnavailable(_)
            | OrderError::OutOfStock { .. }
            | OrderError::IllegalTransition { .. } => Self::Conflict(e.to_string()),
        }
    }
}

impl From<PosterError> for AppError {
    fn from(e: PosterError) -> Self {
        match e {
            PosterError::IllegalTransition { .. } => Self::Conflict(e.to_string()),
            _ => Self::BadRequest(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
