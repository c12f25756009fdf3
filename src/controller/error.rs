//! Control endpoint error types
//!
//! Every failure is reported to HTTP clients as `{"message": "..."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::common::BridgeError;

/// Result type for control endpoint operations
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Control endpoint error types
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Missing or wrong bearer secret
    #[error("Unauthorized")]
    Unauthorized,

    /// Request could not be applied
    #[error("{0}")]
    BadRequest(String),

    /// Address could not be parsed
    #[error("Invalid controller address: {0}")]
    Address(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body returned by the control endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ControllerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ControllerError::BadRequest(_) | ControllerError::Address(_) => StatusCode::BAD_REQUEST,
            ControllerError::Io(_) | ControllerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse { message: self.to_string() };
        (status, Json(body)).into_response()
    }
}

impl From<BridgeError> for ControllerError {
    fn from(err: BridgeError) -> Self {
        ControllerError::BadRequest(err.to_string())
    }
}
