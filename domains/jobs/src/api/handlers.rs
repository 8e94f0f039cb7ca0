use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use scrapeq_auth::AuthUser;
use scrapeq_common::{Error, Result};

use crate::admission::{AdmissionController, SubmitJobRequest};
use crate::domain::{Job, JobEvent, JobStateMachine, JobType};

use super::state::JobsState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub job_type: JobType,
    pub urls: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: i32,
    #[serde(default)]
    pub configuration: Value,
    pub idempotency_key: Option<String>,
}

fn default_max_results() -> i32 {
    100
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub status: String,
    pub job_type: JobType,
    pub total_urls: i32,
    pub processed_urls: i32,
    pub successful_urls: i32,
    pub failed_urls: i32,
    pub result_count: i32,
    pub credits_charged: i64,
    pub error_message: Option<String>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status.to_string(),
            job_type: job.job_type,
            total_urls: job.total_urls,
            processed_urls: job.processed_urls,
            successful_urls: job.successful_urls,
            failed_urls: job.failed_urls,
            result_count: job.result_count,
            credits_charged: job.credits_charged,
            error_message: job.error_message,
        }
    }
}

pub async fn create_job(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateJobRequest>,
) -> Result<Json<JobResponse>> {
    let controller = AdmissionController::new(&state.jobs, &state.accounts.accounts);
    let job = controller
        .submit(SubmitJobRequest {
            user_id,
            job_type: body.job_type,
            urls: body.urls,
            max_results: body.max_results,
            configuration: body.configuration,
            idempotency_key: body.idempotency_key,
        })
            .await?;
    Ok(Json(job.into()))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_jobs(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobResponse>>> {
    let jobs = state.jobs.jobs.list_by_user(user_id, q.limit, q.offset).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

pub async fn get_job(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let job = state.jobs.jobs.get_owned(job_id, user_id).await?;
    Ok(Json(job.into()))
}

async fn apply_user_event(
    state: &JobsState,
    user_id: Uuid,
    job_id: Uuid,
    event: JobEvent,
) -> Result<JobResponse> {
    let job = state.jobs.jobs.get_owned(job_id, user_id).await?;
    let next = JobStateMachine::transition(job.status, event)
        .map_err(|e| Error::InvalidJobState(e.to_string()))?;
    let updated = state.jobs.jobs.update_status(job_id, job.status, next).await?;

    if matches!(event, JobEvent::UserCancel) {
        state.jobs.url_items.cancel_pending_for_job(job_id).await?;
        state.jobs.queue.remove_by_job(job_id).await?;
    }

    Ok(updated.into())
}

pub async fn pause_job(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    Ok(Json(apply_user_event(&state, user_id, job_id, JobEvent::UserPause).await?))
}

pub async fn resume_job(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    Ok(Json(apply_user_event(&state, user_id, job_id, JobEvent::UserResume).await?))
}

pub async fn cancel_job(
    State(state): State<JobsState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    Ok(Json(apply_user_event(&state, user_id, job_id, JobEvent::UserCancel).await?))
}
