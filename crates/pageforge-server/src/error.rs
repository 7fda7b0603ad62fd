//! HTTP error types for `PageForge` server.
//!
//! Most problems on the admin and login forms are shown inline and never
//! reach this type. [`AppError`] covers the rest: unknown pages and
//! storage failures outside the form flow. Every variant
//! renders a small HTML page; internal details go to the log only.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use tracing::error;

use pageforge_core::error::{LayoutError, PageError, StylesheetError};

use crate::views;

/// Application-level error returned from HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Requested resource not found.
    #[error("not found")]
    NotFound,
    /// Internal server error. The message is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "Page not found."),
            Self::Internal(detail) => {
                error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                )
            }
        };
        (status, Html(views::error_page(status, message))).into_response()
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::NotFound { .. } | PageError::Reserved { .. } => Self::NotFound,
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<StylesheetError> for AppError {
    fn from(err: StylesheetError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<LayoutError> for AppError {
    fn from(err: LayoutError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal("disk on fire".to_owned()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn page_errors_map_to_not_found() {
        let err: AppError = PageError::NotFound {
            filename: "x.php".to_owned(),
        }
        .into();
        assert!(matches!(err, AppError::NotFound));

        let err: AppError = PageError::Storage(pageforge_storage::StorageError::Read {
            key: "pages/x.php".to_owned(),
            reason: "io".to_owned(),
        })
        .into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
