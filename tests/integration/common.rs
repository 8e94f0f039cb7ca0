//! Shared test setup. Every test in this crate talks to a real Postgres
//! instance and is `#[ignore]`d by default — run with
//! `cargo test -- --ignored` against a migrated database.

use sqlx::PgPool;

pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run integration tests");
    PgPool::connect(&url)
        .await
        .expect("failed to connect to test database")
}

pub fn test_config() -> scrapeq_common::Config {
    dotenvy::dotenv().ok();
    scrapeq_common::Config::from_env().expect("test environment must provide full configuration")
}
