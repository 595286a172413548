use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::Order;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateOrderRequest {
    #[validate(
        length(max = 500),
        custom(function = "not_blank", message = "must not be empty")
    )]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "at least one item is required"), nested)]
    pub order_items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of Pending, Processing, Shipped, Delivered, Cancelled.
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(address: &str, items: Vec<CreateOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            shipping_address: address.to_string(),
            order_items: items,
        }
    }

    fn item(quantity: i32) -> CreateOrderItem {
        CreateOrderItem {
            product_id: Uuid::new_v4(),
            quantity,
        }
    }

    #[test]
    fn accepts_a_well_formed_order() {
        assert!(request("1 Main St", vec![item(1)]).validate().is_ok());
    }

    #[test]
    fn rejects_blank_address() {
        assert!(request("   ", vec![item(1)]).validate().is_err());
    }

    #[test]
    fn rejects_address_longer_than_500_chars() {
        let address = "a".repeat(501);
        assert!(request(&address, vec![item(1)]).validate().is_err());
        let address = "a".repeat(500);
        assert!(request(&address, vec![item(1)]).validate().is_ok());
    }

    #[test]
    fn rejects_empty_item_list() {
        assert!(request("1 Main St", vec![]).validate().is_err());
    }

    #[test]
    fn rejects_zero_quantity_lines() {
        assert!(request("1 Main St", vec![item(2), item(0)]).validate().is_err());
    }

    #[test]
    fn nested_line_errors_are_reported_under_order_items() {
        let errors = request("1 Main St", vec![item(1), item(0)])
            .validate()
            .unwrap_err();
        assert!(errors.errors().contains_key("order_items"));
        assert!(!errors.errors().contains_key("shipping_address"));
    }
}
