use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        orders::{CreateOrderItem, CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Order, OrderItem, Product, User},
    order_status::OrderStatus,
    response::{ApiResponse, Meta},
    routes::{auth, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        products::list_products,
        products::list_by_category,
        products::get_product,
        products::create_product,
        products::create_product_with_image,
        products::update_product,
        products::delete_product,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderItem,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            CreateProductRequest,
            UpdateProductRequest,
            products::ProductUploadForm,
            ProductList,
            CreateOrderRequest,
            CreateOrderItem,
            UpdateOrderStatusRequest,
            OrderList,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<AuthResponse>,
            ApiResponse<User>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and current user"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Order placement and status"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
