//! Customer API endpoints.
//!
//! Provides CRUD operations for customers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::{error::ApiError, parse_uuid};
use crate::models::Customer;
use crate::state::AppState;

/// Mounted at `/customer`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(create_customer)).route(
        "/{id}",
        get(get_customer).put(update_customer).delete(delete_customer),
    )
}

/// POST /customer
async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<Customer>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut customer) = payload?;
    customer.validate().map_err(|e| ApiError::validation(&e))?;

    customer.id = state
        .customers()
        .create(&customer)
        .await
        .map_err(|e| ApiError::from_db(e, "create customer"))?;

    tracing::debug!(customer_id = %customer.id, "Customer created");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customer/{id}
async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_uuid(&id, "customer")?;
    let customer = state
        .customers()
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve customer"))?;
    Ok(Json(customer))
}

/// PUT /customer/{id}
///
/// Replaces name and email; the id in the path wins over any id in the body.
async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Customer>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let id = parse_uuid(&id, "customer")?;
    let Json(mut customer) = payload?;
    customer.id = id;
    customer.validate().map_err(|e| ApiError::validation(&e))?;

    state
        .customers()
        .update(&customer)
        .await
        .map_err(|e| ApiError::from_db(e, "update customer"))?;
    Ok(Json(customer))
}

/// DELETE /customer/{id}
async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&id, "customer")?;
    state
        .customers()
        .delete(id)
        .await
        .map_err(|e| ApiError::from_db(e, "delete customer"))?;
    Ok(StatusCode::NO_CONTENT)
}
