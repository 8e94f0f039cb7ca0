use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::state::JobsState;

pub fn router() -> Router<JobsState> {
    Router::new()
        .route("/jobs", post(handlers::create_job).get(handlers::list_jobs))
        .route("/jobs/:job_id", get(handlers::get_job).delete(handlers::cancel_job))
        .route("/jobs/:job_id/pause", post(handlers::pause_job))
        .route("/jobs/:job_id/resume", post(handlers::resume_job))
        .route("/jobs/:job_id/cancel", post(handlers::cancel_job))
}
