//! Entity types shared by the HTTP handlers and the stores.
//!
//! Identifiers are assigned by the server; any `id` sent by a client is
//! ignored on create and replaced by the path id on update.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A user. The only entity with a serial integer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct User {
    #[serde(default)]
    pub id: i32,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[serde(default)]
    pub id: Uuid,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Product {
    #[serde(default)]
    pub id: Uuid,

    #[validate(length(min = 2, max = 100))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,

    #[validate(range(exclusive_min = 0.0))]
    pub price: f64,
}

/// An order and the items it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Order {
    #[serde(default)]
    pub id: Uuid,

    pub customer_id: Uuid,

    #[validate(length(min = 1))]
    pub status: String,

    #[validate(range(exclusive_min = 0.0))]
    pub total: f64,

    #[validate(length(min = 1), nested)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OrderItem {
    #[serde(default)]
    pub id: Uuid,

    /// Always the owning order's id; overwritten by the server.
    #[serde(default)]
    pub order_id: Uuid,

    pub product_id: Uuid,

    #[validate(range(exclusive_min = 0.0))]
    pub quantity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn customer(name: &str, email: &str) -> Customer {
        Customer {
            id: Uuid::nil(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[rstest]
    #[case("John Doe", "john.doe@example.com", true)]
    #[case("J", "john.doe@example.com", false)]
    #[case("John Doe", "not-an-email", false)]
    #[case("", "", false)]
    fn test_customer_validation(#[case] name: &str, #[case] email: &str, #[case] valid: bool) {
        assert_eq!(customer(name, email).validate().is_ok(), valid);
    }

    #[test]
    fn test_product_description_defaults_to_empty() {
        let product: Product = serde_json::from_str(r#"{"name":"Widget","price":19.99}"#).unwrap();
        assert_eq!(product.description, "");
        assert_eq!(product.id, Uuid::nil());
        assert!(product.validate().is_ok());
    }

    #[test]
    fn test_product_price_must_be_positive() {
        let product: Product = serde_json::from_str(r#"{"name":"Widget","price":0}"#).unwrap();
        assert!(product.validate().is_err());
    }

    #[test]
    fn test_product_serializes_in_declared_field_order() {
        let product = Product {
            id: Uuid::nil(),
            name: "Widget".to_string(),
            description: String::new(),
            price: 19.99,
        };
        let json = serde_json::to_string(&product).unwrap();
        assert_eq!(
            json,
            r#"{"id":"00000000-0000-0000-0000-000000000000","name":"Widget","description":"","price":19.99}"#
        );
    }

    #[test]
    fn test_order_requires_items() {
        let order = Order {
            id: Uuid::nil(),
            customer_id: Uuid::new_v4(),
            status: "pending".to_string(),
            total: 49.99,
            items: vec![],
        };
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_order_validates_nested_items() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "customer_id": Uuid::new_v4(),
            "status": "pending",
            "total": 49.99,
            "items": [{ "product_id": Uuid::new_v4(), "quantity": 0 }]
        }))
        .unwrap();
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_order_rejects_malformed_customer_id() {
        let result = serde_json::from_value::<Order>(serde_json::json!({
            "customer_id": "not-a-uuid",
            "status": "pending",
            "total": 1.0,
            "items": []
        }));
        assert!(result.is_err());
    }
}
