// Scrapeq API - local development server.
//
// Runs the HTTP API, the dispatcher's hot loop and the reconciler's
// background sweeps as three tasks in one process. Production
// deployments are expected to split the dispatcher into its own
// binary (see `bin/dispatcher.rs`) so it scales independently of the
// HTTP tier.

use std::net::SocketAddr;

use chrono::Duration as ChronoDuration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
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

    info!("starting scrapeq local development server");

    let config = Config::from_env().map_err(|e| {
        error!("failed to load configuration: {}", e);
        e
    })?;

    info!("configuration loaded successfully");

    let pool = PgPool::connect(&config.database_url).await.map_err(|e| {
        error!("failed to connect to database: {}", e);
        anyhow::anyhow!("database connection failed: {}", e)
    })?;

    info!("database connection established");

    let app = scrapeq_app::create_app(&config, pool.clone());
    let app = app
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let (dispatcher_shutdown_tx, dispatcher_shutdown_rx) = tokio::sync::oneshot::channel();
    let (reconciler_shutdown_tx, reconciler_shutdown_rx) = tokio::sync::broadcast::channel(1);

    let dispatcher_handle = tokio::spawn(run_dispatcher(
        config.clone(),
        pool.clone(),
        dispatcher_shutdown_rx,
    ));
    let reconciler_handle = tokio::spawn(scrapeq_reconciler::run(
        JobsRepositories::new(pool.clone()),
        AccountsRepositories::new(pool),
        reconciler_shutdown_rx,
    ));

    info!("server starting on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = dispatcher_shutdown_tx.send(());
    let _ = reconciler_shutdown_tx.send(());
    let _ = dispatcher_handle.await;
    let _ = reconciler_handle.await;

    info!("server shutdown complete");
    Ok(())
}

async fn run_dispatcher(
    config: Config,
    pool: PgPool,
    shutdown: tokio::sync::oneshot::Receiver<()>,
) {
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
    dispatcher.run(shutdown).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            info!("received terminate signal, starting graceful shutdown");
        },
    }
}
