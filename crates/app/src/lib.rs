//! Scrapeq application composition root.
//!
//! Composes the Account Registry, Job Store and Result Ingestor routers
//! into a single HTTP surface, with per-route-class rate limiting.

use axum::middleware;
use axum::Router;
use sqlx::PgPool;

use scrapeq_accounts::api::routes as accounts_routes;
use scrapeq_accounts::{AccountsRepositories, AccountsState};
use scrapeq_auth::{AuthConfig, TokenService};
use scrapeq_common::Config;
use scrapeq_jobs::{JobsRepositories, JobsState};
use scrapeq_ratelimit::{enforce, ClassLimiter, RouteClass};
use scrapeq_results::ResultsState;

/// Create the main application router with all domain routes and
/// rate-limiting middleware attached.
pub fn create_app(config: &Config, pool: PgPool) -> Router {
    let accounts_repos = AccountsRepositories::new(pool.clone());
    let jobs_repos = JobsRepositories::new(pool.clone());

    let auth_config = AuthConfig {
        user_token_secret: config.user_token_secret.clone(),
        job_token_secret: config.job_token_secret.clone(),
        job_token_ttl: config.job_token_ttl,
    };
    let tokens = TokenService::new(auth_config);

    let accounts_state = AccountsState {
        repos: accounts_repos.clone(),
        tokens: tokens.clone(),
    };
    let jobs_state = JobsState {
        jobs: jobs_repos.clone(),
        accounts: accounts_repos,
        tokens: tokens.clone(),
    };
    let results_state = ResultsState {
        jobs: jobs_repos,
        tokens,
        result_files_dir: config.result_files_dir.clone(),
        max_file_size_bytes: config.max_file_size_bytes as i64,
        max_files_per_upload: config.max_files_per_upload as usize,
    };

    let register_routes = accounts_routes::register_router()
        .layer(middleware::from_fn_with_state(
            ClassLimiter::new(RouteClass::Register),
            enforce,
        ))
        .with_state(accounts_state.clone());

    let login_routes = accounts_routes::login_router()
        .layer(middleware::from_fn_with_state(
            ClassLimiter::new(RouteClass::Login),
            enforce,
        ))
        .with_state(accounts_state.clone());

    let account_routes = accounts_routes::account_router()
        .layer(middleware::from_fn_with_state(
            ClassLimiter::new(RouteClass::AccountManagement),
            enforce,
        ))
        .with_state(accounts_state);

    let job_routes = scrapeq_jobs::router()
        .layer(middleware::from_fn_with_state(
            ClassLimiter::new(RouteClass::JobManagement),
            enforce,
        ))
        .with_state(jobs_state);

    let results_routes = scrapeq_results::router()
        .layer(middleware::from_fn_with_state(
            ClassLimiter::new(RouteClass::WorkerSync),
            enforce,
        ))
        .with_state(results_state);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .route(
            "/",
            axum::routing::get(|| async { "Scrapeq API v0.0.1-SNAPSHOT" }),
        )
        .merge(register_routes)
        .merge(login_routes)
        .merge(account_routes)
        .merge(job_routes)
        .merge(results_routes)
}

async fn health_check() -> &'static str {
    "OK"
}
