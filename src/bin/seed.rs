use axum_storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::auth_service::{ROLE_ADMIN, ROLE_USER, hash_password},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "Store Admin", "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let user_id = ensure_user(&orm, "Demo Shopper", "user@example.com", "user123", ROLE_USER).await?;
    seed_products(&orm).await?;

    tracing::info!(%admin_id, %user_id, "seed completed");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        // Re-running the seed keeps the password but re-asserts the role.
        let id = existing.id;
        let mut active: UserActive = existing.into();
        active.role = Set(role.to_string());
        active.update(orm).await?;
        tracing::info!(%email, %role, "user already present");
        return Ok(id);
    }

    let password_hash = hash_password(password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        role: Set(role.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    tracing::info!(%email, %role, "user created");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let products = [
        ("Laptop Pro", "High-performance laptop for professionals", 129_999, 50, "Electronics"),
        ("Wireless Mouse", "Ergonomic wireless mouse with precision tracking", 2_999, 100, "Electronics"),
        ("Office Chair", "Comfortable ergonomic office chair", 24_999, 25, "Furniture"),
        ("Coffee Mug", "Premium ceramic coffee mug", 1_299, 200, "Home"),
    ];

    for (name, description, price, stock, category) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            price: Set(price),
            stock_quantity: Set(stock),
            image_url: Set(String::new()),
            category: Set(category.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
    }

    tracing::info!("seeded products");
    Ok(())
}
