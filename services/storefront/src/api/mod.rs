//! HTTP API handlers and routing.

mod customers;
pub mod error;
mod health;
mod orders;
mod products;
mod root;
mod users;

use axum::{
    http::{header, Method},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::state::AppState;
use error::ApiError;

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    Router::new()
        .merge(root::routes())
        .merge(health::routes())
        .nest("/user", users::routes())
        .nest("/customer", customers::routes())
        .nest("/product", products::routes())
        .nest("/order", orders::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

/// Parse a UUID path segment, answering 400 "Invalid <entity> ID" otherwise.
pub(crate) fn parse_uuid(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid {entity} ID")))
}
