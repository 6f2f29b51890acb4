use axum::http::StatusCode;
use product_core::{CoreError, ModelError, ProductId};

use crate::response::{Envelope, INTERNAL_ERROR_MESSAGE};

/// API error types with JSON envelopes.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or missing/invalid input field.
    BadRequest(String),
    /// Resource not found.
    NotFound(String),
    /// Internal server error. The cause is logged, never returned.
    Internal,
}

impl ApiError {
    pub fn product_not_found(id: &ProductId) -> Self {
        ApiError::NotFound(format!("ProductID {id} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg,
            ApiError::Internal => INTERNAL_ERROR_MESSAGE.to_string(),
        };

        Envelope::json(status, &serde_json::json!({ "Message": message }))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                tracing::error!("Core error: {other}");
                ApiError::Internal
            }
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
