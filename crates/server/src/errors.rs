use aichart::{ErrorKind, ExtractError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

pub const NOT_CONFIGURED_MESSAGE: &str = "Server is not configured correctly.";
pub const UNREADABLE_MESSAGE: &str =
    "The document could not be read clearly. Please try a sharper image or a different file.";
pub const NO_PAGES_MESSAGE: &str = "The document contains no pages.";
pub const CANCELLED_MESSAGE: &str = "The extraction was cancelled before it finished.";

/// A custom error type for the server application.
///
/// Each variant maps to one HTTP status. Internal details are logged and never
/// returned to the client.
#[derive(Debug)]
pub enum AppError {
    /// Errors originating from the extraction pipeline.
    Extract(ExtractError),
    /// The request itself was malformed.
    BadRequest(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        AppError::Extract(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Extract(err) => match err.kind() {
                ErrorKind::Configuration => {
                    error!("Configuration error: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        NOT_CONFIGURED_MESSAGE.to_string(),
                    )
                }
                ErrorKind::Extraction | ErrorKind::Render => {
                    warn!("Extraction failed: {}", err);
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        UNREADABLE_MESSAGE.to_string(),
                    )
                }
                ErrorKind::Merge => {
                    warn!("Merge failed: {}", err);
                    (StatusCode::UNPROCESSABLE_ENTITY, NO_PAGES_MESSAGE.to_string())
                }
                ErrorKind::Cancelled => {
                    (StatusCode::REQUEST_TIMEOUT, CANCELLED_MESSAGE.to_string())
                }
            },
            AppError::BadRequest(message) => {
                warn!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
