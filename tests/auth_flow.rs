mod common;

use axum_storefront_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    middleware::auth::decode_token,
    services::auth_service,
};

use common::setup_state;

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        name: "Ada Lovelace".to_string(),
        email: email.to_string(),
        password: "analytical".to_string(),
    }
}

#[tokio::test]
async fn register_issues_a_token_for_a_plain_user() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let auth = auth_service::register_user(&state, registration("Ada@Example.com"))
        .await?
        .data
        .expect("auth data");

    assert_eq!(auth.user.email, "ada@example.com");
    assert_eq!(auth.user.role, "user");

    let decoded = decode_token(&state.config.jwt, &auth.token)?;
    assert_eq!(decoded.user_id, auth.user.id);
    assert_eq!(decoded.role, "user");

    let me = auth_service::current_user(&state, &decoded)
        .await?
        .data
        .expect("user");
    assert_eq!(me.name, "Ada Lovelace");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;
    auth_service::register_user(&state, registration("ada@example.com")).await?;

    let err = auth_service::register_user(&state, registration("ADA@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn invalid_registration_payload_is_rejected() -> anyhow::Result<()> {
    let state = setup_state().await?;

    let err = auth_service::register_user(&state, registration("not-an-email"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let mut short = registration("ada@example.com");
    short.password = "abc".to_string();
    let err = auth_service::register_user(&state, short).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn login_checks_the_password() -> anyhow::Result<()> {
    let state = setup_state().await?;
    auth_service::register_user(&state, registration("ada@example.com")).await?;

    let auth = auth_service::login_user(
        &state,
        LoginRequest {
            email: " ADA@example.com".to_string(),
            password: "analytical".to_string(),
        },
    )
    .await?
    .data
    .expect("auth data");
    assert!(decode_token(&state.config.jwt, &auth.token).is_ok());

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: "ada@example.com".to_string(),
            password: "difference-engine".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "analytical".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn tokens_are_bound_to_secret_and_audience() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let auth = auth_service::register_user(&state, registration("ada@example.com"))
        .await?
        .data
        .expect("auth data");

    let mut other_secret = state.config.jwt.clone();
    other_secret.secret = "another-secret".to_string();
    assert!(matches!(
        decode_token(&other_secret, &auth.token),
        Err(AppError::Unauthorized(_))
    ));

    let mut other_audience = state.config.jwt.clone();
    other_audience.audience = "someone-else".to_string();
    assert!(decode_token(&other_audience, &auth.token).is_err());

    assert!(decode_token(&state.config.jwt, "garbage").is_err());
    Ok(())
}
