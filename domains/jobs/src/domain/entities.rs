//! Job Store entities: `Job`, `UrlWorkItem`, `ResultRow`,
//! `ResultFile`, `AccountAssignment`.

use chrono::{DateTime, Utc};
use scrapeq_common::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use super::state::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "job_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Profile,
    Company,
    Search,
}

/// Queue priority: higher dispatches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    pub const LOW: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(5);
    pub const HIGH: Priority = Priority(10);
    pub const URGENT: Priority = Priority(20);
}

impl JobType {
    /// Job-type default priority.
    pub fn default_priority(&self) -> Priority {
        match self {
            JobType::Profile => Priority::NORMAL,
            JobType::Company => Priority::NORMAL,
            JobType::Search => Priority::HIGH,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub max_results: i32,
    pub configuration: Json<Value>,
    pub total_urls: i32,
    pub processed_urls: i32,
    pub successful_urls: i32,
    pub failed_urls: i32,
    pub result_count: i32,
    pub credits_charged: i64,
    pub idempotency_key: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resumed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// How the dispatcher picks among a job's frozen assignment set.
/// Controlled by `configuration.account_selection_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSelectionMode {
    LeastRecentlyUsed,
    Rotation,
}

impl Job {
    pub fn account_selection_mode(&self) -> AccountSelectionMode {
        match self.configuration.get("account_selection_mode").and_then(Value::as_str) {
            Some("rotation") => AccountSelectionMode::Rotation,
            _ => AccountSelectionMode::LeastRecentlyUsed,
        }
    }

    pub fn new(
        user_id: Uuid,
        job_type: JobType,
        configuration: Value,
        max_results: i32,
        total_urls: i32,
        credits_charged: i64,
        idempotency_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            job_type,
            status: JobStatus::Pending,
            max_results,
            configuration: Json(configuration),
            total_urls,
            processed_urls: 0,
            successful_urls: 0,
            failed_urls: 0,
            result_count: 0,
            credits_charged,
            idempotency_key,
            error_message: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            paused_at: None,
            resumed_at: None,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Invariant: `total_urls == pending + in_flight + completed + failed
    /// + cancelled` and `processed_urls == completed + failed` must hold
    /// at the Job Store level. This checks the subset of invariants visible on
    /// the Job row alone.
    pub fn validate(&self) -> Result<(), Error> {
        if self.processed_urls != self.successful_urls + self.failed_urls {
            return Err(Error::Validation(
                "processed_urls must equal successful_urls + failed_urls".to_string(),
            ));
        }
        if self.processed_urls > self.total_urls {
            return Err(Error::Validation(
                "processed_urls must not exceed total_urls".to_string(),
            ));
        }
        if self.status.is_terminal() && self.completed_at.is_none() {
            return Err(Error::Validation(
                "a terminal job must carry a completed_at timestamp".to_string(),
            ));
        }
        if self.status == JobStatus::Failed && self.error_message.is_none() {
            return Err(Error::Validation(
                "a failed job must carry an error_message".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "url_item_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UrlItemStatus {
    Pending,
    InFlight,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UrlWorkItem {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url: String,
    pub status: UrlItemStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub leased_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UrlWorkItem {
    pub fn new(job_id: Uuid, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_id,
            url: url.into(),
            status: UrlItemStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            last_error: None,
            leased_until: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub url_item_id: Option<Uuid>,
    pub job_type: JobType,
    pub payload: Json<Value>,
    pub payload_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ResultFile {
    pub id: Uuid,
    pub job_id: Uuid,
    pub original_name: String,
    pub stored_path: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Many-to-many between `Job` and `Account`, frozen at admission.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountAssignment {
    pub job_id: Uuid,
    pub account_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        Job::new(Uuid::new_v4(), JobType::Profile, json!({}), 100, 3, 3, None)
    }

    #[test]
    fn test_job_type_default_priorities() {
        assert_eq!(JobType::Profile.default_priority(), Priority::NORMAL);
        assert_eq!(JobType::Company.default_priority(), Priority::NORMAL);
        assert_eq!(JobType::Search.default_priority(), Priority::HIGH);
    }

    #[test]
    fn test_new_job_is_pending_with_zero_counters() {
        let j = job();
        assert_eq!(j.status, JobStatus::Pending);
        assert_eq!(j.processed_urls, 0);
        assert_eq!(j.result_count, 0);
    }

    #[test]
    fn test_validate_rejects_processed_mismatch() {
        let mut j = job();
        j.successful_urls = 1;
        j.failed_urls = 1;
        j.processed_urls = 1; // should be 2
        assert!(j.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_terminal_without_completed_at() {
        let mut j = job();
        j.status = JobStatus::Completed;
        assert!(j.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_failed_without_error_message() {
        let mut j = job();
        j.status = JobStatus::Failed;
        j.completed_at = Some(Utc::now());
        assert!(j.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_consistent_completed_job() {
        let mut j = job();
        j.status = JobStatus::Completed;
        j.completed_at = Some(Utc::now());
        j.processed_urls = 3;
        j.successful_urls = 3;
        assert!(j.validate().is_ok());
    }

    #[test]
    fn test_account_selection_mode_defaults_to_least_recently_used() {
        assert_eq!(job().account_selection_mode(), AccountSelectionMode::LeastRecentlyUsed);
    }

    #[test]
    fn test_account_selection_mode_reads_rotation_from_configuration() {
        let j = Job::new(
            Uuid::new_v4(),
            JobType::Profile,
            json!({ "account_selection_mode": "rotation" }),
            100,
            3,
            3,
            None,
        );
        assert_eq!(j.account_selection_mode(), AccountSelectionMode::Rotation);
    }
}
