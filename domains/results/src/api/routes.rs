use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::state::ResultsState;

pub fn router() -> Router<ResultsState> {
    Router::new()
        .route("/jobs/:job_id/results", get(handlers::get_results))
        .route("/jobs/:job_id/submit", post(handlers::submit))
        .route("/jobs/:job_id/upload", post(handlers::upload))
        .route("/jobs/:job_id/progress", post(handlers::progress))
        .route("/jobs/:job_id/error", post(handlers::report_error))
}
