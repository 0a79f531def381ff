//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use otagate_api::responses::ErrorMessage;
use otagate_client::BackendError;
use otagate_core::CoreError;
use tracing::error;

/// Everything a handler can fail with
#[derive(Debug)]
pub enum AppError {
    /// Orchestration failure, mapped through [`CoreError::status_code`]
    Core(CoreError),
    /// Malformed request body
    Validation(String),
    /// Missing or unknown `OTA-TOKEN`
    Unauthorized,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorMessage {
            message: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // replay what the backend said, status included
            AppError::Core(CoreError::Backend(BackendError::Status { status, body, .. })) => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, Json(body)).into_response()
            }
            AppError::Core(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    error!(error = %err, "request failed");
                }
                message(status, err.to_string())
            }
            AppError::Validation(msg) => message(StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => message(StatusCode::UNAUTHORIZED, "Authorization required"),
        }
    }
}
