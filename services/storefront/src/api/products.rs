//! Product API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::{error::ApiError, parse_uuid};
use crate::models::Product;
use crate::state::AppState;

/// Mounted at `/product`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(create_product)).route(
        "/{id}",
        get(get_product).put(update_product).delete(delete_product),
    )
}

/// POST /product
async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut product) = payload?;
    product.validate().map_err(|e| ApiError::validation(&e))?;

    product.id = state
        .products()
        .create(&product)
        .await
        .map_err(|e| ApiError::from_db(e, "create product"))?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /product/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let id = parse_uuid(&id, "product")?;
    let product = state
        .products()
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve product"))?;
    Ok(Json(product))
}

/// PUT /product/{id}
///
/// Answers 204 with no body; read the product back to see the stored state.
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&id, "product")?;
    let Json(mut product) = payload?;
    product.id = id;
    product.validate().map_err(|e| ApiError::validation(&e))?;

    state
        .products()
        .update(&product)
        .await
        .map_err(|e| ApiError::from_db(e, "update product"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /product/{id}
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&id, "product")?;
    state
        .products()
        .delete(id)
        .await
        .map_err(|e| ApiError::from_db(e, "delete product"))?;
    Ok(StatusCode::NO_CONTENT)
}
