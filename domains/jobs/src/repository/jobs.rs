//! Job Store: plain CRUD and counter maintenance for
//! `Job` rows.

use scrapeq_common::{Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Job, JobStatus};

#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {id} not found")))
    }

    /// Used by the Result Ingestor to reject requests against a job that
    /// does not belong to the caller's token.
    pub async fn get_owned(&self, id: Uuid, user_id: Uuid) -> Result<Job> {
        let job = self.get(id).await?;
        if job.user_id != user_id {
            return Err(Error::NotFound(format!("job {id} not found")));
        }
        Ok(job)
    }

    pub async fn find_by_idempotency_key(
        &self,
        user_id: Uuid,
        key: &str,
    ) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE user_id = $1 AND idempotency_key = $2",
        )
            .bind(user_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Concurrent-job admission guard.
    pub async fn count_active_by_user(&self, user_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(*) FROM jobs WHERE user_id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')",
        )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list_by_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }

    /// Conditional update used by every status transition so a stale
    /// read can never clobber a concurrent one.
    pub async fn update_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
    ) -> Result<Job> {
        let timestamp_column = match next {
            JobStatus::Running if expected == JobStatus::Pending => Some("started_at"),
            JobStatus::Paused => Some("paused_at"),
            JobStatus::Running if expected == JobStatus::Paused => Some("resumed_at"),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => Some("completed_at"),
            _ => None,
        };

        let query = match timestamp_column {
            Some(column) => format!(
                "UPDATE jobs SET status = $3, {column} = now(), updated_at = now() \
                 WHERE id = $1 AND status = $2 RETURNING *"
            ),
            None => "UPDATE jobs SET status = $3, updated_at = now() \
                     WHERE id = $1 AND status = $2 RETURNING *"
                         .to_string(),
        };

        let updated = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(expected)
            .bind(next)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| {
            Error::Conflict(format!("job {id} was not in status {expected} when updated"))
        })
    }

    pub async fn set_error(&self, id: Uuid, message: &str) -> Result<()> {
        sqlx::query("UPDATE jobs SET error_message = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(message)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Atomically rolls a completed/failed URL outcome into the job's
    /// counters and flips status to `Completed` once every URL is
    /// accounted for.
    pub async fn record_url_outcome(
        &self,
        id: Uuid,
        succeeded: bool,
        result_count_delta: i32,
    ) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET processed_urls = processed_urls + 1,
                successful_urls = successful_urls + CASE WHEN $2 THEN 1 ELSE 0 END,
                failed_urls = failed_urls + CASE WHEN $2 THEN 0 ELSE 1 END,
                result_count = result_count + $3,
                status = CASE
                    WHEN processed_urls + 1 >= total_urls AND status = 'running' THEN 'completed'
                    ELSE status
                END,
                completed_at = CASE
                    WHEN processed_urls + 1 >= total_urls AND status = 'running' THEN now()
                    ELSE completed_at
                END,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(succeeded)
            .bind(result_count_delta)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {id} not found")))?;
        Ok(job)
    }

    /// Reconciler task: jobs stuck `Running` with no lease activity past
    /// the threshold get their stalled URLs released.
    pub async fn list_stalled(&self, stale_minutes: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT j.* FROM jobs j
            WHERE j.status = 'running'
              AND j.updated_at < now() - ($1 || ' minutes')::interval
              AND EXISTS (
                  SELECT 1 FROM url_work_items u
                  WHERE u.job_id = j.id AND u.status = 'in_flight'
                    AND u.leased_until < now()
              )
            "#,
        )
            .bind(stale_minutes.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }
}
