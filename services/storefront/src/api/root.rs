//! Entity-free endpoints: greeting, ping and JSON echo checks.

use axum::{
    extract::{rejection::JsonRejection, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(hello).post(receive_json).put(replace_json))
        .route("/ping", get(ping))
        .route("/any/{id}", delete(delete_any))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct KeyPayload {
    #[validate(length(min = 1))]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub message: &'static str,
}

// =============================================================================
// Handlers
// =============================================================================

async fn hello() -> &'static str {
    "Hello, world!"
}

async fn ping() -> &'static str {
    "pong"
}

fn accept(payload: Result<Json<KeyPayload>, JsonRejection>) -> Result<KeyPayload, ApiError> {
    let Json(payload) = payload?;
    // Validation failures share the bind-failure message.
    payload.validate().map_err(|_| ApiError::invalid_body())?;
    Ok(payload)
}

/// POST /
async fn receive_json(
    payload: Result<Json<KeyPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    accept(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "JSON received",
        }),
    ))
}

/// PUT /
async fn replace_json(
    payload: Result<Json<KeyPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    accept(payload)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: "JSON received",
        }),
    ))
}

/// DELETE /any/{id}
async fn delete_any(Path(id): Path<String>) -> Json<DeletedResponse> {
    Json(DeletedResponse {
        id,
        message: "Resource deleted",
    })
}
