//! The dispatcher's hot loop: reserve a queued job, pick an eligible
//! account, lease its next URL, and hand out a signed unit of work.

use std::time::Duration as StdDuration;

use chrono::Duration as ChronoDuration;
use uuid::Uuid;

use scrapeq_accounts::repository::transactions::reserve_request_tx;
use scrapeq_accounts::AccountsRepositories;
use scrapeq_auth::TokenService;
use scrapeq_common::Result;
use scrapeq_jobs::repository::transactions::list_assignments_tx;
use scrapeq_jobs::JobsRepositories;

use crate::backoff::{backoff_delay, backoff_delay_std};
use crate::pick::pick_account;

#[derive(Debug, Clone)]
pub struct DispatchedWork {
    pub job_id: Uuid,
    pub url_item_id: Uuid,
    pub url: String,
    pub account_id: Uuid,
    pub job_token: String,
}

pub struct Dispatcher {
    jobs: JobsRepositories,
    accounts: AccountsRepositories,
    tokens: TokenService,
    job_token_ttl: StdDuration,
    lease_duration: ChronoDuration,
}

impl Dispatcher {
    pub fn new(
        jobs: JobsRepositories,
        accounts: AccountsRepositories,
        tokens: TokenService,
        job_token_ttl: StdDuration,
        lease_duration: ChronoDuration,
    ) -> Self {
        Self {
            jobs,
            accounts,
            tokens,
            job_token_ttl,
            lease_duration,
        }
    }

    /// One reservation-to-handout cycle. Returns `Some(work)` if a URL
    /// was leased, `None` if the queue is empty or nothing could be
    /// advanced this tick (the job is backed off either way).
    pub async fn tick(&self) -> Result<Option<DispatchedWork>> {
        let Some(queue_item) = self.jobs.queue.reserve_next(self.lease_duration).await? else {
            return Ok(None);
        };

        let job_id = queue_item.job_id;
        let job = self.jobs.jobs.get(job_id).await?;

        if job.status.is_terminal() {
            self.jobs.queue.remove_by_job(job_id).await?;
            return Ok(None);
        }

        let mut tx = self.jobs.begin().await?;
        let assignments = list_assignments_tx(&mut tx, job_id).await?;
        tx.commit().await?;

        let mut candidates = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            if let Some(account) = self.accounts.accounts.find(assignment.account_id).await? {
                candidates.push(account);
            }
        }

        let Some(chosen) = pick_account(
            &candidates,
            chrono::Utc::now(),
            job.account_selection_mode(),
            job.processed_urls,
        )
        .cloned() else {
            self.jobs
                .queue
                .defer(queue_item.id, backoff_delay(job.processed_urls as u32))
                .await?;
            return Ok(None);
        };

        let mut tx = self.accounts.begin().await?;
        let reserved = reserve_request_tx(&mut tx, chosen.id).await?;
        tx.commit().await?;

        let Ok(account) = reserved else {
            self.jobs.queue.release(queue_item.id).await?;
            return Ok(None);
        };

        let Some(url_item) = self.jobs.url_items.lease_next(job_id, self.lease_duration).await? else {
            // No pending URLs left for this job: nothing more to dispatch.
            self.jobs.queue.remove_by_job(job_id).await?;
            return Ok(None);
        };

        if job.status == scrapeq_jobs::JobStatus::Pending {
            self.jobs
                .jobs
                .update_status(job_id, scrapeq_jobs::JobStatus::Pending, scrapeq_jobs::JobStatus::Running)
                .await?;
        }

        let job_token = self
            .tokens
            .issue_job(job_id, job.user_id, self.job_token_ttl)
            .map_err(|e| scrapeq_common::Error::Internal(e.to_string()))?;

        self.jobs.queue.release(queue_item.id).await?;

        Ok(Some(DispatchedWork {
            job_id,
            url_item_id: url_item.id,
            url: url_item.url,
            account_id: account.id,
            job_token,
        }))
    }

    /// Runs the tick loop until `shutdown` resolves, sleeping with
    /// exponential backoff whenever a tick finds no work.
    pub async fn run(&self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let mut idle_attempts: u32 = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("dispatcher shutting down");
                    return;
                }
                result = self.tick() => {
                    match result {
                        Ok(Some(work)) => {
                            idle_attempts = 0;
                            tracing::debug!(job_id = %work.job_id, url_item_id = %work.url_item_id, "dispatched work");
                        }
                        Ok(None) => {
                            idle_attempts = idle_attempts.saturating_add(1);
                            tokio::time::sleep(backoff_delay_std(idle_attempts)).await;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "dispatcher tick failed");
                            idle_attempts = idle_attempts.saturating_add(1);
                            tokio::time::sleep(backoff_delay_std(idle_attempts)).await;
                        }
                    }
                }
            }
        }
    }
}
