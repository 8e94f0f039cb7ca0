use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use scrapeq_auth::JobAuth;
use scrapeq_common::{Error, Result};
use scrapeq_jobs::{JobEvent, JobStateMachine, JobStatus};

use crate::storage;

use super::state::ResultsState;

fn require_job_scope(job_id: Uuid, claims: &scrapeq_auth::JobClaims) -> Result<()> {
    if claims.job_id != job_id {
        return Err(Error::Authorization(
            "job token does not scope to this job".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub results: Vec<Value>,
    pub url_item_id: Option<Uuid>,
    #[serde(default)]
    pub is_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub accepted: usize,
    pub status: String,
}

pub async fn submit(
    State(state): State<ResultsState>,
    JobAuth(claims): JobAuth,
    Path(job_id): Path<Uuid>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>> {
    require_job_scope(job_id, &claims)?;
    let job = state.jobs.jobs.get_owned(job_id, claims.user_id).await?;

    if job.status != JobStatus::Running {
        return Err(Error::InvalidJobState(format!(
            "job {job_id} is {}, not running",
            job.status
        )));
    }

    let mut accepted = 0usize;
    for payload in body.results {
        let (_, is_new) = state
            .jobs
            .results
            .insert_if_new(job_id, body.url_item_id, job.job_type, payload)
            .await?;
        if is_new {
            accepted += 1;
        }
    }

    let job = if let Some(url_item_id) = body.url_item_id {
        state.jobs.url_items.complete(url_item_id).await?;
        state
            .jobs
            .jobs
            .record_url_outcome(job_id, true, accepted as i32)
            .await?
    } else {
        job
    };

    let next = JobStateMachine::transition(
        job.status,
        JobEvent::Submit {
            is_complete: body.is_complete,
        },
    )
    .map_err(|e| Error::InvalidJobState(e.to_string()))?;

    let job = if next != job.status {
        state.jobs.jobs.update_status(job_id, job.status, next).await?
    } else {
        job
    };

    Ok(Json(SubmitResponse {
        accepted,
        status: job.status.to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub id: Uuid,
    pub original_name: String,
    pub size_bytes: i64,
}

pub async fn upload(
    State(state): State<ResultsState>,
    JobAuth(claims): JobAuth,
    Path(job_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<Vec<UploadedFile>>> {
    require_job_scope(job_id, &claims)?;
    state.jobs.jobs.get_owned(job_id, claims.user_id).await?;

    let mut uploaded = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed multipart body: {e}")))?
    {
        if uploaded.len() >= state.max_files_per_upload {
            return Err(Error::Validation(format!(
                "at most {} files are accepted per upload",
                state.max_files_per_upload
            )));
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        if !storage::is_allowed_content_type(&content_type) {
            return Err(Error::Validation(format!(
                "content type {content_type} is not accepted"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(format!("failed to read upload: {e}")))?;
        if bytes.len() as i64 > state.max_file_size_bytes {
            return Err(Error::PayloadTooLarge(format!(
                "file {original_name} exceeds the per-file size limit"
            )));
        }

        let stored_path = storage::save_file(&state.result_files_dir, job_id, &original_name, &bytes).await?;
        let file = state
            .jobs
            .results
            .insert_file(job_id, &original_name, &stored_path, bytes.len() as i64, &content_type)
            .await?;

        uploaded.push(UploadedFile {
            id: file.id,
            original_name: file.original_name,
            size_bytes: file.size_bytes,
        });
    }

    Ok(Json(uploaded))
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub percent: f32,
    pub message: Option<String>,
    pub current_url: Option<String>,
}

pub async fn progress(
    JobAuth(claims): JobAuth,
    Path(job_id): Path<Uuid>,
    Json(body): Json<ProgressRequest>,
) -> Result<Json<serde_json::Value>> {
    require_job_scope(job_id, &claims)?;
    if !(0.0..=100.0).contains(&body.percent) {
        return Err(Error::Validation("percent must be within [0, 100]".to_string()));
    }

    tracing::info!(
        job_id = %job_id,
        percent = body.percent,
        current_url = body.current_url.as_deref(),
        message = body.message.as_deref(),
        "job progress"
    );

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ErrorRequest {
    pub error_message: String,
    pub error_code: Option<String>,
    #[serde(default)]
    pub is_fatal: bool,
}

pub async fn report_error(
    State(state): State<ResultsState>,
    JobAuth(claims): JobAuth,
    Path(job_id): Path<Uuid>,
    Json(body): Json<ErrorRequest>,
) -> Result<Json<serde_json::Value>> {
    require_job_scope(job_id, &claims)?;
    let job = state.jobs.jobs.get_owned(job_id, claims.user_id).await?;

    state.jobs.jobs.set_error(job_id, &body.error_message).await?;
    tracing::warn!(
        job_id = %job_id,
        error_code = body.error_code.as_deref(),
        is_fatal = body.is_fatal,
        "worker reported error"
    );

    if body.is_fatal {
        let next = JobStateMachine::transition(job.status, JobEvent::FatalError)
            .map_err(|e| Error::InvalidJobState(e.to_string()))?;
        state.jobs.jobs.update_status(job_id, job.status, next).await?;
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct GetResultsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub rows: Vec<scrapeq_jobs::ResultRow>,
    pub files: Vec<scrapeq_jobs::ResultFile>,
    pub total: i64,
}

pub async fn get_results(
    State(state): State<ResultsState>,
    JobAuth(claims): JobAuth,
    Path(job_id): Path<Uuid>,
    Query(q): Query<GetResultsQuery>,
) -> Result<Json<ResultsResponse>> {
    require_job_scope(job_id, &claims)?;
    state.jobs.jobs.get_owned(job_id, claims.user_id).await?;

    let rows = state.jobs.results.list_for_job(job_id, q.limit, q.offset).await?;
    let files = state.jobs.results.list_files_for_job(job_id).await?;
    let total = state.jobs.results.count_for_job(job_id).await?;

    Ok(Json(ResultsResponse { rows, files, total }))
}
