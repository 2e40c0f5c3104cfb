use flaking_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, run_migrations},
    observability::init_tracing,
    rate_limit::{SlidingWindowRateLimiter, Sweeper},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config.observability);

    tracing::info!("Starting Flaking API {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded: {:?}", config.server);

    let db_pool = create_pool(&config.database).await?;
    run_migrations(&db_pool).await?;

    // One limiter for the whole process, shared by every rate-limited route
    let limiter = Arc::new(SlidingWindowRateLimiter::new());
    let sweeper = Sweeper::spawn(
        limiter.clone(),
        Duration::from_secs(config.rate_limit.sweep_interval_seconds),
        Duration::from_secs(config.rate_limit.staleness_seconds),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState::new(db_pool.clone(), limiter, config)?;
    let app = create_router(state)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    sweeper.shutdown().await;
    db_pool.close().await;

    tracing::info!("Flaking API stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
