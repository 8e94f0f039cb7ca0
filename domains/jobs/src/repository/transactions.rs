//! Cross-table writes composed inside one transaction for admission.

use scrapeq_common::Result;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{AccountAssignment, Job, Priority, UrlWorkItem};

use super::queue::QueueRepository;

/// Persists the job row, its URL work items, and the frozen account
/// assignment set, then enqueues the job for dispatch — all inside the
/// caller's transaction so a crash between steps leaves nothing behind.
pub async fn create_job_tx(
    tx: &mut Transaction<'_, Postgres>,
    job: &Job,
    urls: &[UrlWorkItem],
    account_ids: &[Uuid],
    priority: Priority,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs
            (id, user_id, job_type, status, max_results, configuration, total_urls,
             processed_urls, successful_urls, failed_urls, result_count, credits_charged,
             idempotency_key, error_message, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
        .bind(job.id)
        .bind(job.user_id)
        .bind(job.job_type)
        .bind(job.status)
        .bind(job.max_results)
        .bind(&job.configuration)
        .bind(job.total_urls)
        .bind(job.processed_urls)
        .bind(job.successful_urls)
        .bind(job.failed_urls)
        .bind(job.result_count)
        .bind(job.credits_charged)
        .bind(&job.idempotency_key)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut **tx)
        .await?;

    super::url_items::UrlItemRepository::insert_many_tx(tx, urls).await?;

    for account_id in account_ids {
        sqlx::query("INSERT INTO account_assignments (job_id, account_id) VALUES ($1, $2)")
            .bind(job.id)
            .bind(account_id)
            .execute(&mut **tx)
            .await?;
    }

    QueueRepository::enqueue_tx(tx, job.id, priority).await?;

    Ok(())
}

pub async fn list_assignments_tx(
    tx: &mut Transaction<'_, Postgres>,
    job_id: Uuid,
) -> Result<Vec<AccountAssignment>> {
    let rows = sqlx::query_as::<_, AccountAssignment>(
        "SELECT * FROM account_assignments WHERE job_id = $1",
    )
        .bind(job_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}
