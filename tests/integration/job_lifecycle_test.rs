use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

mod common;

async fn send(
    app: axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let response = app
        .oneshot(builder.body(axum::body::Body::from(body.to_string())).unwrap())
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

async fn register(app: axum::Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        json!({ "email": email, "password": "correct horse battery staple" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_create_job_requires_eligible_account() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let app = scrapeq_app::create_app(&config, pool.clone());
    let token = register(app, &email).await;

    // No scraping account has been registered for this user yet, so
    // admission should refuse the job rather than queue unserviceable work.
    let app = scrapeq_app::create_app(&config, pool);
    let (status, _) = send(
        app,
        "POST",
        "/jobs",
        Some(&token),
        json!({
            "job_type": "profile",
            "urls": ["https://www.linkedin.com/in/someone"],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_get_job_rejects_unauthenticated_requests() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let app = scrapeq_app::create_app(&config, pool);

    let (status, _) = send(app, "GET", &format!("/jobs/{}", Uuid::new_v4()), None, Value::Null).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_list_jobs_starts_empty_for_new_user() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let email = format!("{}@example.com", Uuid::new_v4());

    let app = scrapeq_app::create_app(&config, pool.clone());
    let token = register(app, &email).await;

    let app = scrapeq_app::create_app(&config, pool);
    let (status, body) = send(app, "GET", "/jobs", Some(&token), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}
