//! User API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Mounted at `/user`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid user ID"))
}

/// POST /user
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<User>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut user) = payload?;
    user.validate().map_err(|e| ApiError::validation(&e))?;

    user.id = state
        .users()
        .create(&user)
        .await
        .map_err(|e| ApiError::from_db(e, "create user"))?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /user/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    let user = state
        .users()
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve user"))?;
    Ok(Json(user))
}

/// PUT /user/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<User>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    let Json(mut user) = payload?;
    user.id = id;
    user.validate().map_err(|e| ApiError::validation(&e))?;

    state
        .users()
        .update(&user)
        .await
        .map_err(|e| ApiError::from_db(e, "update user"))?;
    Ok(Json(user))
}

/// DELETE /user/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state
        .users()
        .delete(id)
        .await
        .map_err(|e| ApiError::from_db(e, "delete user"))?;
    Ok(StatusCode::NO_CONTENT)
}
