//! The four periodic sweeps. Each is a pure `async fn` over the
//! repository handles it needs, independent of the loop that schedules it.

use chrono::Utc;
use scrapeq_accounts::AccountsRepositories;
use scrapeq_common::Result;
use scrapeq_jobs::JobsRepositories;

pub const STALE_MINUTES: i64 = 30;

/// Midnight task: every account's daily request counter back to zero.
pub async fn reset_daily_counters(accounts: &AccountsRepositories) -> Result<u64> {
    let mut tx = accounts.begin().await?;
    let affected = scrapeq_accounts::repository::transactions::reset_daily_tx(&mut tx).await?;
    tx.commit().await?;
    Ok(affected)
}

/// Every minute: clears `cooldown_until`/`blocked_until` deadlines that
/// have passed so those accounts become eligible again.
pub async fn unblock_expired_accounts(accounts: &AccountsRepositories) -> Result<u64> {
    let mut tx = accounts.begin().await?;
    let affected = scrapeq_accounts::repository::transactions::unblock_expired_tx(&mut tx, Utc::now()).await?;
    tx.commit().await?;
    Ok(affected)
}

/// Every 30 seconds: URL leases the dispatcher never completed or failed
/// go back to `pending` so another dispatch attempt can pick them up.
pub async fn expire_stale_leases(jobs: &JobsRepositories) -> Result<u64> {
    jobs.url_items.expire_leases().await
}

/// Every 30 minutes: jobs stuck `running` whose leases expired get their
/// queue reservation cleared so the dispatcher revisits them.
pub async fn restart_stalled_jobs(jobs: &JobsRepositories) -> Result<usize> {
    let stalled = jobs.jobs.list_stalled(STALE_MINUTES).await?;
    let count = stalled.len();
    for job in stalled {
        jobs.queue.release_by_job(job.id).await?;
        tracing::warn!(job_id = %job.id, "released stalled job's queue reservation");
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_minutes_is_thirty() {
        assert_eq!(STALE_MINUTES, 30);
    }
}
