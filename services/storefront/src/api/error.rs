use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::db::DbError;

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The response for any body that fails to bind.
    pub fn invalid_body() -> Self {
        Self::bad_request("Invalid request body")
    }

    pub fn validation(errors: &ValidationErrors) -> Self {
        Self::bad_request(format!("Validation failed: {errors}"))
    }

    /// Map a store failure, logging anything that is not the caller's fault.
    ///
    /// `action` reads like "create customer" and ends up in the 500 message.
    pub fn from_db(err: DbError, action: &str) -> Self {
        match err {
            DbError::NotFound { entity, .. } => {
                Self::not_found(format!("{} not found", capitalize(entity)))
            }
            DbError::ForeignKey { constraint, .. } => {
                tracing::warn!(constraint = %constraint, action, "Foreign key violation");
                if action.starts_with("delete") {
                    Self::conflict("Resource is still referenced")
                } else {
                    Self::bad_request("Referenced resource does not exist")
                }
            }
            other => {
                tracing::error!(error = %other, action, "Database operation failed");
                Self::internal(format!("Failed to {action}"))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::invalid_body()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
