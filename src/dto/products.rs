use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    /// Minor currency units.
    #[validate(range(min = 1))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub image_url: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CreateProductRequest {
        CreateProductRequest {
            name: "Wireless Mouse".into(),
            description: "Ergonomic".into(),
            price: 2999,
            stock_quantity: 100,
            image_url: String::new(),
            category: "Electronics".into(),
        }
    }

    #[test]
    fn accepts_a_complete_product() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_price_and_negative_stock() {
        let mut req = valid();
        req.price = 0;
        req.stock_quantity = -1;
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("price"));
        assert!(fields.contains_key("stock_quantity"));
    }

    #[test]
    fn category_is_required() {
        let mut req = valid();
        req.category = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(UpdateProductRequest::default().validate().is_ok());
    }
}
