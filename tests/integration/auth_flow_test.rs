use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

mod common;

async fn send(app: axum::Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let parsed = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, parsed)
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_register_then_login_issues_access_token() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let app = scrapeq_app::create_app(&config, pool.clone());
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        json!({ "email": email, "password": "correct horse battery staple" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().unwrap().len() > 0);

    let app = scrapeq_app::create_app(&config, pool);
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        json!({ "email": email, "password": "correct horse battery staple" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().unwrap().len() > 0);
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_login_with_wrong_password_is_rejected() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let app = scrapeq_app::create_app(&config, pool.clone());
    send(
        app,
        "POST",
        "/auth/register",
        json!({ "email": email, "password": "correct horse battery staple" }),
    )
    .await;

    let app = scrapeq_app::create_app(&config, pool);
    let (status, _) = send(
        app,
        "POST",
        "/auth/login",
        json!({ "email": email, "password": "wrong password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_duplicate_registration_is_rejected() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let app = scrapeq_app::create_app(&config, pool.clone());
    send(
        app,
        "POST",
        "/auth/register",
        json!({ "email": email, "password": "correct horse battery staple" }),
    )
    .await;

    let app = scrapeq_app::create_app(&config, pool);
    let (status, _) = send(
        app,
        "POST",
        "/auth/register",
        json!({ "email": email, "password": "a different password" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
