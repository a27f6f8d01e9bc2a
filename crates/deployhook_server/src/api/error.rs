//! API error handling.
//!
//! Every error body is `{"success": false, "error": ...}`; a failed
//! deployment also carries its outcome.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deployhook_core::{CoreError, DeploymentOutcome};
use serde_json::json;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    /// A deployment of the same repository is already running
    Conflict(String),
    /// The pipeline ran and failed
    DeploymentFailed {
        message: String,
        outcome: Box<DeploymentOutcome>,
    },
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DeploymentFailed { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::Conflict(msg) => {
                json!({ "success": false, "error": msg })
            }
            Self::DeploymentFailed { message, outcome } => {
                json!({ "success": false, "error": message, "deployment": outcome })
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "success": false, "error": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPayload(_) => ApiError::BadRequest("Invalid JSON payload".to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
