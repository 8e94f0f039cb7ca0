//! Token claim shapes for the two bearer-token kinds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a long-lived user access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject: the authenticated user's id.
    pub sub: Uuid,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a short-lived job capability token.
///
/// Authority is limited to identifying `(job_id, user_id)` — the Result
/// Ingestor re-checks ownership and job status against the Job Store
/// before honoring any mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobClaims {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub iat: i64,
    pub exp: i64,
}

pub const KIND_ACCESS: &str = "access";
pub const KIND_JOB: &str = "job";
