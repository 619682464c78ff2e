use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Why an inbound frame was ignored. Never reported back to the client.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("binary frame is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("message type is not \"vote\"")]
    UnexpectedType,
}

/// A snapshot could not be queued for one connection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SendFailure {
    #[error("connection closed")]
    Closed,
    #[error("outbound queue full")]
    Full,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("no vote categories declared")]
    NoCategories,
    #[error("category declared twice: {0}")]
    DuplicateCategory(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Tally coordinator is not running")]
    CoordinatorUnavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::CoordinatorUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string()
        }));

        (status, body).into_response()
    }
}
