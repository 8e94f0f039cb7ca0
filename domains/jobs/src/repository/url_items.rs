//! URL work item leasing: the dispatcher's hot path.

use chrono::{Duration, Utc};
use scrapeq_common::{Error, Result};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{UrlItemStatus, UrlWorkItem};

#[derive(Debug, Clone)]
pub struct UrlItemRepository {
    pool: PgPool,
}

impl UrlItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_many_tx(
        tx: &mut Transaction<'_, Postgres>,
        items: &[UrlWorkItem],
    ) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO url_work_items
                    (id, job_id, url, status, attempts, max_attempts, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
                .bind(item.id)
                .bind(item.job_id)
                .bind(&item.url)
                .bind(item.status)
                .bind(item.attempts)
                .bind(item.max_attempts)
                .bind(item.created_at)
                .bind(item.updated_at)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    /// Leases the next pending URL for `job_id`, row-locked with
    /// `SKIP LOCKED` so concurrent dispatcher workers never collide on
    /// the same URL.
    pub async fn lease_next(&self, job_id: Uuid, lease_duration: Duration) -> Result<Option<UrlWorkItem>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, UrlWorkItem>(
            r#"
            SELECT * FROM url_work_items
            WHERE job_id = $1 AND status = 'pending'
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut item) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let leased_until = Utc::now() + lease_duration;
        item = sqlx::query_as::<_, UrlWorkItem>(
            r#"
            UPDATE url_work_items
            SET status = 'in_flight', attempts = attempts + 1, leased_until = $2, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(item.id)
            .bind(leased_until)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(item))
    }

    pub async fn complete(&self, id: Uuid) -> Result<UrlWorkItem> {
        let item = sqlx::query_as::<_, UrlWorkItem>(
            "UPDATE url_work_items SET status = 'completed', updated_at = now() WHERE id = $1 RETURNING *",
        )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("url work item {id} not found")))?;
        Ok(item)
    }

    /// Marks a URL failed, returning it to `pending` for retry while
    /// `attempts < max_attempts`, else terminally `failed`.
    pub async fn fail(&self, id: Uuid, error: &str) -> Result<UrlWorkItem> {
        let item = sqlx::query_as::<_, UrlWorkItem>(
            r#"
            UPDATE url_work_items
            SET status = CASE WHEN attempts < max_attempts THEN 'pending' ELSE 'failed' END,
                last_error = $2,
                leased_until = NULL,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
            .bind(id)
            .bind(error)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound(format!("url work item {id} not found")))?;
        Ok(item)
    }

    pub async fn cancel_pending_for_job(&self, job_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE url_work_items SET status = 'cancelled', updated_at = now() \
             WHERE job_id = $1 AND status IN ('pending', 'in_flight')",
        )
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_pending(&self, job_id: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(*) FROM url_work_items WHERE job_id = $1 AND status IN ('pending', 'in_flight')",
        )
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Reconciler task: leases that expired without a result or error
    /// callback go back to `pending`.
    pub async fn expire_leases(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE url_work_items SET status = 'pending', leased_until = NULL, updated_at = now() \
             WHERE status = 'in_flight' AND leased_until < now()",
        )
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn status_of(&self, id: Uuid) -> Result<UrlItemStatus> {
        let (status,): (UrlItemStatus,) =
            sqlx::query_as("SELECT status FROM url_work_items WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound(format!("url work item {id} not found")))?;
        Ok(status)
    }
}
