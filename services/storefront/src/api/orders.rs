//! Order API endpoints.
//!
//! Orders carry their items inline. Responses always reflect what was
//! stored, including the server-assigned item ids.

use std::collections::HashSet;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::{error::ApiError, parse_uuid};
use crate::models::Order;
use crate::state::AppState;

/// Mounted at `/order`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/{id}", get(get_order).put(update_order).delete(delete_order))
}

fn check(order: &Order) -> Result<(), ApiError> {
    order.validate().map_err(|e| ApiError::validation(&e))?;

    let mut seen = HashSet::new();
    if let Some(dup) = order.items.iter().find(|item| !seen.insert(item.product_id)) {
        return Err(ApiError::bad_request(format!(
            "Product {} appears more than once",
            dup.product_id
        )));
    }
    Ok(())
}

/// POST /order
async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<Order>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(order) = payload?;
    check(&order)?;

    let orders = state.orders();
    let id = orders
        .create(&order)
        .await
        .map_err(|e| ApiError::from_db(e, "create order"))?;
    let stored = orders
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve order"))?;

    tracing::debug!(order_id = %id, items = stored.items.len(), "Order created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /order/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_uuid(&id, "order")?;
    let order = state
        .orders()
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve order"))?;
    Ok(Json(order))
}

/// PUT /order/{id}
async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Order>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let id = parse_uuid(&id, "order")?;
    let Json(mut order) = payload?;
    order.id = id;
    check(&order)?;

    let orders = state.orders();
    orders
        .update(&order)
        .await
        .map_err(|e| ApiError::from_db(e, "update order"))?;
    let stored = orders
        .get(id)
        .await
        .map_err(|e| ApiError::from_db(e, "retrieve order"))?;
    Ok(Json(stored))
}

/// DELETE /order/{id}
async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_uuid(&id, "order")?;
    state
        .orders()
        .delete(id)
        .await
        .map_err(|e| ApiError::from_db(e, "delete order"))?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn order_with_products(products: &[Uuid]) -> Order {
        serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "status": "pending",
            "total": 49.99,
            "items": products
                .iter()
                .map(|p| serde_json::json!({ "product_id": p, "quantity": 2 }))
                .collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    #[test]
    fn test_check_accepts_distinct_products() {
        let order = order_with_products(&[Uuid::new_v4(), Uuid::new_v4()]);
        assert!(check(&order).is_ok());
    }

    #[test]
    fn test_check_rejects_duplicate_products() {
        let product = Uuid::new_v4();
        let err = check(&order_with_products(&[product, product])).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains(&product.to_string()));
    }

    #[test]
    fn test_check_rejects_empty_items() {
        let err = check(&order_with_products(&[])).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
