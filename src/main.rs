use anyhow::{Context, Result};
use bet_maker::{
    api::{create_router, AppState},
    admission::AdmissionController,
    clients::{EventOracle, LineProviderClient},
    config::Settings,
    query::QueryService,
    settlement_checker::SettlementChecker,
    wager_store::{SqliteWagerStore, WagerStore},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bet_maker=debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bet-maker");

    let settings = Settings::load()?;

    let line_provider = LineProviderClient::new(&settings.line_provider_url, settings.oracle_timeout())
        .context("Failed to build line provider client")?;
    info!("Line provider: {}", line_provider.base_url());
    let oracle: Arc<dyn EventOracle> = Arc::new(line_provider);

    let store: Arc<dyn WagerStore> = Arc::new(
        SqliteWagerStore::open(settings.database_path())
            .with_context(|| format!("Failed to open wager store at {}", settings.database_path()))?,
    );

    let admission = Arc::new(AdmissionController::new(oracle.clone(), store.clone()));
    let query = Arc::new(QueryService::new(oracle.clone(), store.clone()));

    let settlement_checker = Arc::new(
        SettlementChecker::new(oracle, store)
            .with_interval(settings.sweep_interval())
            .with_max_concurrent_lookups(settings.max_concurrent_lookups),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let settlement_task = settlement_checker.spawn(shutdown_rx);

    let app = create_router(AppState { admission, query });
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;
    info!("🎯 API server listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Waiting for settlement checker to finish...");
    let _ = shutdown_tx.send(true);
    if let Err(e) = settlement_task.await {
        warn!("Settlement task ended abnormally: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
