use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Shown when the store itself fails. Never carries detail.
pub const STORAGE_FAILURE_REPLY: &str = "Pixy's brain fried 😵‍💫";

#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or empty required input. The message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    /// The model call failed; carries the user-safe fallback text.
    #[error("upstream failure, replied with fallback: {0}")]
    Upstream(String),

    #[error("conversation storage failure: {0}")]
    Storage(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) | RelayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to put in a response body
    pub fn public_message(&self) -> &str {
        match self {
            RelayError::Validation(msg) | RelayError::Upstream(msg) => msg,
            RelayError::Storage(_) => STORAGE_FAILURE_REPLY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        if let RelayError::Storage(_) = &self {
            tracing::error!("[Relay] {}", self);
        }
        (self.status(), Json(json!({ "error": self.public_message() }))).into_response()
    }
}
