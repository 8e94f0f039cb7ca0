//! Queue: a Postgres-table-backed priority queue of jobs
//! ready for dispatch. One row per admitted job; the dispatcher reserves
//! the highest-priority, oldest-enqueued ready row with
//! `FOR UPDATE SKIP LOCKED` so multiple dispatcher workers never pick the
//! same job at once.

use chrono::{DateTime, Duration, Utc};
use scrapeq_common::Result;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::Priority;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueueItem {
    pub id: Uuid,
    pub job_id: Uuid,
    pub priority: i32,
    pub enqueued_at: DateTime<Utc>,
    pub available_at: DateTime<Utc>,
    pub leased_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: PgPool,
}

impl QueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue_tx(
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
        priority: Priority,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queue_items (id, job_id, priority, enqueued_at, available_at)
            VALUES ($1, $2, $3, now(), now())
            ON CONFLICT (job_id) DO NOTHING
            "#,
        )
            .bind(Uuid::new_v4())
            .bind(job_id)
            .bind(priority.0)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Reserves the next ready job, leasing it so a second dispatcher
    /// worker skips it until the lease expires.
    pub async fn reserve_next(&self, lease_duration: Duration) -> Result<Option<QueueItem>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, QueueItem>(
            r#"
            SELECT * FROM queue_items
            WHERE available_at <= now() AND (leased_until IS NULL OR leased_until < now())
            ORDER BY priority DESC, enqueued_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
            .fetch_optional(&mut *tx)
            .await?;

        let Some(mut item) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let leased_until = Utc::now() + lease_duration;
        item = sqlx::query_as::<_, QueueItem>(
            "UPDATE queue_items SET leased_until = $2 WHERE id = $1 RETURNING *",
        )
            .bind(item.id)
            .bind(leased_until)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(item))
    }

    /// Releases the reservation so the next dispatcher tick can pick the
    /// job back up — called after each URL lease/dispatch attempt, win
    /// or lose.
    pub async fn release(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE queue_items SET leased_until = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Backs a job off after a dispatch attempt found no eligible
    /// account.
    pub async fn defer(&self, id: Uuid, delay: Duration) -> Result<()> {
        sqlx::query("UPDATE queue_items SET leased_until = NULL, available_at = now() + $2 WHERE id = $1")
            .bind(id)
            .bind(delay)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reconciler task: clears a stuck lease by job id, for jobs whose
    /// dispatcher worker died mid-tick and never released its reservation.
    pub async fn release_by_job(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE queue_items SET leased_until = NULL WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes a job from the queue once it has no pending URLs left to
    /// dispatch.
    pub async fn remove_by_job(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM queue_items WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
