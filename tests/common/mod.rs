#![allow(dead_code)]

use std::path::PathBuf;

use axum_storefront_api::{
    config::{AppConfig, JwtConfig},
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    services::auth_service::{ROLE_ADMIN, ROLE_USER},
    state::AppState,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-do-not-use";

pub fn test_config(upload_dir: PathBuf) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            issuer: "storefront-api".to_string(),
            audience: "storefront-clients".to_string(),
            ttl_hours: 1,
        },
        upload_dir,
        cors_origins: vec!["http://localhost:4200".to_string()],
    }
}

/// Fresh in-memory database with the schema applied.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let upload_dir = std::env::temp_dir().join(format!("storefront-test-{}", Uuid::new_v4()));
    let config = test_config(upload_dir);
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm, config))
}

pub async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(email.split('@').next().unwrap_or("user").to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn shopper(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, ROLE_USER, &format!("{}@example.com", Uuid::new_v4())).await
}

pub async fn admin(state: &AppState) -> anyhow::Result<AuthUser> {
    create_user(state, ROLE_ADMIN, &format!("{}@example.com", Uuid::new_v4())).await
}

pub async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
    category: &str,
) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(format!("{name} for testing")),
        price: Set(price),
        stock_quantity: Set(stock),
        image_url: Set(String::new()),
        category: Set(category.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    use axum_storefront_api::entity::products::Entity as Products;
    use sea_orm::EntityTrait;

    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} missing"))?;
    Ok(product.stock_quantity)
}
