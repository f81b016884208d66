use axum::{Json,
    http::StatusCode,
    response::IntoResponse
};
use serde_json::json;
use thiserror::Error;

use crate::{storage::StorageError, telegram::TelegramError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),
}

/// Convert `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        // Map application errors to HTTP status codes and messages
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::FileTooLarge(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Multipart(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Database(err) => {
                tracing::error!("Database Error: {:}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::Storage(StorageError::NotFound(key)) => (
                StatusCode::NOT_FOUND,
                format!("File not found: {}", key),
            ),
            AppError::Storage(err) => {
                tracing::error!("Storage Error: {:}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            // Telegram caps bot downloads; that is a caller problem, not a
            // server fault, and gets its own message.
            AppError::Telegram(TelegramError::FileTooBig) => (
                StatusCode::BAD_REQUEST,
                TelegramError::FileTooBig.to_string(),
            ),
            AppError::Telegram(err) => {
                tracing::error!("Telegram Error: {:}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        // Return standardized JSON error response
        let body = Json(json!({"error": error_message}));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let resp = AppError::BadRequest("uploaderId is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_409() {
        let resp = AppError::Conflict("File already exists".into()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn oversize_maps_to_400() {
        let resp = AppError::FileTooLarge("File size exceeds 50MB".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_storage_object_maps_to_404() {
        let resp = AppError::Storage(StorageError::NotFound("u1/a.txt".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn telegram_too_big_is_a_distinct_400() {
        let resp = AppError::Telegram(TelegramError::FileTooBig).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn generic_telegram_failure_maps_to_500() {
        let resp =
            AppError::Telegram(TelegramError::Api("chat not found".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
