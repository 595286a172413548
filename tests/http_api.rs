mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use axum_storefront_api::app::build_app;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{create_product, setup_state};

async fn send(app: &Router, request: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, body))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

#[tokio::test]
async fn health_endpoint_answers() -> anyhow::Result<()> {
    let app = build_app(setup_state().await?);

    let (status, body) = send(&app, get("/health", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn unknown_route_uses_the_envelope() -> anyhow::Result<()> {
    let app = build_app(setup_state().await?);

    let (status, body) = send(&app, get("/nope", None)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
    Ok(())
}

#[tokio::test]
async fn orders_require_a_bearer_token() -> anyhow::Result<()> {
    let app = build_app(setup_state().await?);

    let (status, _) = send(&app, get("/api/orders", None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get("/api/orders", Some("not-a-jwt"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn shopper_registers_and_places_an_order() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let widget = create_product(&state, "Widget", 500, 10, "Tools").await?;
    let app = build_app(state);

    let (status, body) = send(&app, get("/api/products", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["meta"]["total"], 1);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "name": "Grace", "email": "grace@example.com", "password": "cobol-rules" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["data"]["token"]
        .as_str()
        .expect("token")
        .to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            Some(&token),
            json!({
                "shipping_address": "1 Navy Yard",
                "order_items": [{ "product_id": widget.id, "quantity": 3 }]
            }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["total_amount"], 1500);
    assert_eq!(body["data"]["status"], "Pending");
    assert_eq!(body["data"]["order_items"][0]["product_name"], "Widget");
    let order_id = body["data"]["id"].as_str().expect("id").to_string();

    let (status, body) = send(&app, get("/api/orders", Some(&token))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], order_id.as_str());

    let (status, body) = send(&app, get(&format!("/api/products/{}", widget.id), None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock_quantity"], 7);

    // shoppers cannot move orders along
    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/orders/{order_id}/status"),
            Some(&token),
            json!({ "status": "Shipped" }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn oversized_order_returns_bad_request() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let widget = create_product(&state, "Widget", 500, 2, "Tools").await?;
    let app = build_app(state);

    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({ "name": "Linus", "email": "linus@example.com", "password": "penguin" }),
        ),
    )
    .await?;
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/orders",
            Some(&token),
            json!({
                "shipping_address": "Helsinki",
                "order_items": [{ "product_id": widget.id, "quantity": 5 }]
            }),
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("Insufficient stock for product Widget")
    );
    Ok(())
}
