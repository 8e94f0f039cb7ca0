use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use tower::ServiceExt;

mod common;

#[tokio::test]
#[ignore] // requires a migrated Postgres database; run locally only
async fn test_health_endpoint_returns_ok() {
    let config = common::test_config();
    let pool = common::test_pool().await;
    let app = scrapeq_app::create_app(&config, pool);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}
