use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::multipart::MultipartError;
use invoice_parser::CredentialError;
use serde_json::json;
use tracing::{error, warn};

/// A custom error type for the server application.
///
/// Every variant renders as `{"error": message}` with a matching status code.
#[derive(Debug)]
pub enum AppError {
    /// The request was understood but cannot be processed as sent.
    BadRequest(String),
    /// The multipart body could not be read (malformed, or over the size limit).
    Multipart(MultipartError),
    /// No bearer token could be obtained, so no file was processed.
    Credential(CredentialError),
    /// The batch did not finish within the configured deadline.
    Timeout(u64),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Credential(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::BadRequest(message) => {
                warn!("Rejected request: {message}");
                (StatusCode::BAD_REQUEST, message)
            }
            AppError::Multipart(err) => {
                warn!("Multipart error: {err}");
                (err.status(), err.body_text())
            }
            AppError::Credential(err) => {
                error!("CredentialError: {:?}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("Failed to authenticate with Document AI: {err}"),
                )
            }
            AppError::Timeout(secs) => {
                error!("Batch exceeded its {secs}s deadline.");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("Processing did not complete within {secs} seconds."),
                )
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
