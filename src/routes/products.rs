use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    services::{
        image_service::MAX_IMAGE_BYTES,
        product_service::{self, ProductImage},
    },
    state::AppState,
};

/// Upper bound for a multipart upload: the image plus the text fields.
pub const MAX_UPLOAD_BODY_BYTES: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Multipart body of `POST /api/products/upload`; documentation only.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProductUploadForm {
    name: String,
    description: Option<String>,
    price: i64,
    stock_quantity: i32,
    category: String,
    #[schema(value_type = String, format = Binary)]
    image: Vec<u8>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/upload",
            post(create_product_with_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/category/{category}", get(list_by_category))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "Active products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/category/{category}",
    params(
        ("category" = String, Path, description = "Category name, case-insensitive")
    ),
    responses(
        (status = 200, description = "Active products in category", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_by_category(&state, &category).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/products/upload",
    request_body(content = ProductUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Create product with image", body = ApiResponse<Product>),
        (status = 400, description = "Missing or invalid image, or invalid fields"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product_with_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let (payload, image) = read_product_form(multipart).await?;
    let resp = product_service::create_product_with_image(&state, &user, payload, image).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deactivated"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

async fn read_product_form(
    mut multipart: Multipart,
) -> AppResult<(CreateProductRequest, Option<ProductImage>)> {
    let mut name = None;
    let mut description = String::new();
    let mut price = None;
    let mut stock_quantity = None;
    let mut category = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                image = Some(ProductImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "name" => name = Some(field.text().await.map_err(bad_form)?),
            "description" => description = field.text().await.map_err(bad_form)?,
            "price" => price = Some(parse_number::<i64>("price", &field.text().await.map_err(bad_form)?)?),
            "stock_quantity" => {
                stock_quantity = Some(parse_number::<i32>(
                    "stock_quantity",
                    &field.text().await.map_err(bad_form)?,
                )?)
            }
            "category" => category = Some(field.text().await.map_err(bad_form)?),
            _ => {}
        }
    }

    let payload = CreateProductRequest {
        name: required("name", name)?,
        description,
        price: required("price", price)?,
        stock_quantity: required("stock_quantity", stock_quantity)?,
        image_url: String::new(),
        category: required("category", category)?,
    };
    Ok((payload, image))
}

fn bad_form(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::BadRequest(format!("{field}: must be a whole number")))
}

fn required<T>(field: &str, value: Option<T>) -> AppResult<T> {
    value.ok_or_else(|| AppError::BadRequest(format!("{field}: is required")))
}
