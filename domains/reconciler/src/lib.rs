//! Reconciler: background sweeps that repair drift the hot path leaves
//! behind — expired leases, passed cooldowns, stalled jobs, and the
//! daily counter reset.

pub mod tasks;

use std::time::Duration;

use scrapeq_accounts::AccountsRepositories;
use scrapeq_jobs::JobsRepositories;

const UNBLOCK_INTERVAL: Duration = Duration::from_secs(60);
const LEASE_EXPIRY_INTERVAL: Duration = Duration::from_secs(30);
const STALL_RECOVERY_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Runs every periodic sweep until `shutdown` fires. Each sweep is its
/// own `tokio::time::interval` loop; a tick's error is logged and never
/// brought down the process.
pub async fn run(
    jobs: JobsRepositories,
    accounts: AccountsRepositories,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let daily = tokio::spawn(run_daily_reset(accounts.clone(), shutdown.resubscribe()));
    let unblock = tokio::spawn(run_unblock(accounts.clone(), shutdown.resubscribe()));
    let leases = tokio::spawn(run_lease_expiry(jobs.clone(), shutdown.resubscribe()));
    let stalled = tokio::spawn(run_stall_recovery(jobs.clone(), shutdown.resubscribe()));

    let _ = shutdown.recv().await;
    for handle in [daily, unblock, leases, stalled] {
        handle.abort();
    }
}

async fn run_daily_reset(accounts: AccountsRepositories, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
    loop {
        let now = chrono::Utc::now();
        let next_midnight = (now + chrono::Duration::days(1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        let until_midnight = (next_midnight - now).to_std().unwrap_or(Duration::from_secs(3600));

        tokio::select! {
            _ = shutdown.recv() => return,
            _ = tokio::time::sleep(until_midnight) => {}
        }

        match tasks::reset_daily_counters(&accounts).await {
            Ok(n) => tracing::info!(accounts_reset = n, "daily counters reset"),
            Err(e) => tracing::error!(error = %e, "daily counter reset failed"),
        }
    }
}

async fn run_unblock(accounts: AccountsRepositories, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(UNBLOCK_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = interval.tick() => {}
        }
        match tasks::unblock_expired_accounts(&accounts).await {
            Ok(n) if n > 0 => tracing::info!(accounts_unblocked = n, "cooldowns/blocks cleared"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "account unblock sweep failed"),
        }
    }
}

async fn run_lease_expiry(jobs: JobsRepositories, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(LEASE_EXPIRY_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = interval.tick() => {}
        }
        match tasks::expire_stale_leases(&jobs).await {
            Ok(n) if n > 0 => tracing::info!(leases_expired = n, "stale url leases expired"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "lease expiry sweep failed"),
        }
    }
}

async fn run_stall_recovery(jobs: JobsRepositories, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(STALL_RECOVERY_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = interval.tick() => {}
        }
        match tasks::restart_stalled_jobs(&jobs).await {
            Ok(n) if n > 0 => tracing::info!(jobs_restarted = n, "stalled jobs restarted"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "stalled job recovery failed"),
        }
    }
}
