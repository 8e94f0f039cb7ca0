// Standalone dispatcher process. Scales independently of the HTTP API
// tier: run as many of these as the queue's throughput needs.

use chrono::Duration as ChronoDuration;
use tracing::{error, info};

use scrapeq_accounts::AccountsRepositories;
use scrapeq_auth::{AuthConfig, TokenService};
use scrapeq_common::Config;
use scrapeq_dispatcher::Dispatcher;
use scrapeq_jobs::JobsRepositories;
use sqlx::PgPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .pretty()
        .init();

    info!("starting scrapeq dispatcher");

    let config = Config::from_env().map_err(|e| {
        error!("failed to load configuration: {}", e);
        e
    })?;

    let pool = PgPool::connect(&config.database_url).await.map_err(|e| {
        error!("failed to connect to database: {}", e);
        anyhow::anyhow!("database connection failed: {}", e)
    })?;

    let auth_config = AuthConfig {
        user_token_secret: config.user_token_secret.clone(),
        job_token_secret: config.job_token_secret.clone(),
        job_token_ttl: config.job_token_ttl,
    };
    let dispatcher = Dispatcher::new(
        JobsRepositories::new(pool.clone()),
        AccountsRepositories::new(pool),
        TokenService::new(auth_config),
        config.job_token_ttl,
        ChronoDuration::from_std(config.lease_duration).unwrap_or(ChronoDuration::minutes(5)),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received Ctrl+C, shutting down dispatcher");
        let _ = shutdown_tx.send(());
    });

    dispatcher.run(shutdown_rx).await;
    info!("dispatcher shutdown complete");
    Ok(())
}
