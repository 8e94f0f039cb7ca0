use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::state::AccountsState;

pub fn register_router() -> Router<AccountsState> {
    Router::new().route("/auth/register", post(handlers::register))
}

pub fn login_router() -> Router<AccountsState> {
    Router::new().route("/auth/login", post(handlers::login))
}

/// Profile and scraping-identity management for an already-authenticated user.
pub fn account_router() -> Router<AccountsState> {
    Router::new()
        .route("/me", get(handlers::get_profile))
        .route(
            "/accounts",
            post(handlers::create_account).get(handlers::list_accounts),
        )
        .route("/accounts/:account_id", get(handlers::get_account))
}

pub fn router() -> Router<AccountsState> {
    register_router().merge(login_router()).merge(account_router())
}
