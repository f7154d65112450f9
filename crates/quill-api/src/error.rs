//! Error type shared by all handlers, with the wire envelope for each case.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Payload or query validation failure; carries the offending field.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("Email already in use")]
    EmailTaken,

    /// One message for both unknown email and wrong password; the caller
    /// never learns which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Every authentication failure collapses to this one shape; the reason
    /// is never distinguished on the wire.
    #[error("Unauthorized")]
    Unauthorized,

    /// Public fetch miss; holds the full wire message.
    #[error("{0}")]
    NotFound(&'static str),

    /// Causes are logged server-side, never surfaced.
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": { "field": field, "message": message },
                }),
            ),
            ApiError::EmailTaken | ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": self.to_string() }),
            ),
            // The guard's envelope carries no `success` field
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" }))
            }
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": message }),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "success": false, "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
