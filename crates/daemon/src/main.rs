//! Jobwatch Daemon - Main Entry Point
//! Scheduled scrape cycles + JSON-RPC query server

mod logging;
mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

// Import workspace crates
use jobwatch_api_rpc::RpcServer;
use jobwatch_core::application::{
    shutdown_channel, CycleScheduler, QueryService, ReconcileService, ScrapeCycle,
};
use jobwatch_core::port::id_provider::UuidProvider;
use jobwatch_core::port::time_provider::SystemTimeProvider;
use jobwatch_core::port::JobSource;
use jobwatch_infra_csv::CsvRecordStore;
use jobwatch_infra_system::{CommandSource, LogNotifier};
use settings::Settings;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let settings = Settings::load().context("Failed to load settings")?;
    settings.validate().context("Invalid settings")?;

    // 2. Initialize logging (kept alive until exit so file logs are flushed)
    let _log_guard = logging::init(settings.log_dir().as_deref())?;

    info!("Jobwatch daemon v{} starting...", VERSION);
    info!(
        store = %settings.store_path().display(),
        delta = %settings.delta_path().display(),
        interval_minutes = settings.schedule.interval_minutes,
        sources = settings.sources.len(),
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);

    let store = Arc::new(CsvRecordStore::new(settings.store_path(), time_provider.clone()));
    let delta = Arc::new(CsvRecordStore::new(settings.delta_path(), time_provider.clone()));
    let reconciler = Arc::new(ReconcileService::new(
        store.clone(),
        delta,
        time_provider.clone(),
    ));

    let sources: Vec<Arc<dyn JobSource>> = settings
        .sources
        .iter()
        .map(|s| {
            Arc::new(CommandSource::new(s.to_spec(), settings.env_allowlist.clone()))
                as Arc<dyn JobSource>
        })
        .collect();
    if sources.is_empty() {
        warn!("No sources configured; cycles will only refresh the store file");
    }

    let cycle = Arc::new(ScrapeCycle::new(
        sources,
        reconciler,
        Arc::new(LogNotifier::default()),
        time_provider.clone(),
        id_provider,
    ));
    let scheduler = Arc::new(CycleScheduler::new(
        cycle,
        settings.interval(),
        settings.schedule.run_on_start,
    ));

    // 4. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_server = RpcServer::new(
        settings.rpc_config(),
        QueryService::new(store),
        scheduler.clone(),
    );
    let (rpc_addr, rpc_handle) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 5. Start scheduler (cycle loop)
    info!("Starting cycle scheduler...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut scheduler_handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

    info!(rpc = %rpc_addr, "System ready");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: a running cycle finishes its save first
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;

    if scheduler.is_running() {
        info!("Waiting for the running cycle to finish (Ctrl+C again to force)");
    }
    tokio::select! {
        res = async {
            let res = (&mut scheduler_handle).await;
            // A manually triggered cycle may still be saving
            scheduler.wait_idle().await;
            res
        } => {
            if let Err(e) = res {
                error!(error = %e, "Scheduler task failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Second interrupt, exiting without waiting for the running cycle");
        }
    }

    info!("Shutdown complete.");

    Ok(())
}
