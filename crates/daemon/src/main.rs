//! Offline Queue - Daemon Entry Point
//! Wires storage, submitters and connectivity, then serves the operator console

mod console;
mod settings;

use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use offline_queue_core::application::{shutdown_channel, OfflineQueue, OfflineQueueOptions};
use offline_queue_core::domain::ActionKind;
use offline_queue_core::port::{
    ManualNetworkMonitor, NetworkMonitor, SnapshotStore, SubmitterRegistry, SystemTimeProvider,
    UuidProvider,
};
use offline_queue_infra_sqlite::open_snapshot_store;
use offline_queue_infra_system::{FileSnapshotStore, HttpSubmitter, TcpProbeMonitor};
use settings::{LogFormat, NetworkMode, Settings, StorageBackend};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_LOG_FILTER: &str = "offline_queue=info";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let args: Vec<String> = std::env::args().collect();
    let config_path = Settings::config_path_from_args(&args);
    let settings = Settings::load(config_path.as_deref())?;

    // 2. Initialize logging (stderr, so console replies stay on stdout)
    init_logging(settings.log_format)?;
    info!("Offline Queue v{} starting...", VERSION);
    if let Some(path) = &config_path {
        info!(config_path = %path.display(), "Loaded configuration file");
    }

    // 3. Snapshot storage
    let time_provider = Arc::new(SystemTimeProvider);
    let storage_path = settings.storage_path();
    let snapshots: Arc<dyn SnapshotStore> = match settings.storage.backend {
        StorageBackend::Sqlite => {
            if let Some(parent) = storage_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create data directory {}", parent.display())
                })?;
            }
            info!(db_path = %storage_path.display(), "Initializing SQLite snapshot store...");
            Arc::new(
                open_snapshot_store(&storage_path.to_string_lossy(), time_provider.clone())
                    .await
                    .context("SQLite snapshot store initialization failed")?,
            )
        }
        StorageBackend::File => {
            info!(dir = %storage_path.display(), "Using file snapshot store");
            Arc::new(FileSnapshotStore::new(&storage_path))
        }
    };

    // 4. Submitters, one per action kind
    let submitters = SubmitterRegistry::new()
        .with(
            ActionKind::Bounty,
            Arc::new(HttpSubmitter::new(
                &settings.remote.base_url,
                &settings.remote.bounty_path,
            )?),
        )
        .with(
            ActionKind::Message,
            Arc::new(HttpSubmitter::new(
                &settings.remote.base_url,
                &settings.remote.message_path,
            )?),
        );

    // 5. Connectivity
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let mut background: Vec<JoinHandle<()>> = Vec::new();
    let mut manual_network: Option<Arc<ManualNetworkMonitor>> = None;

    let network: Arc<dyn NetworkMonitor> = match settings.network.mode {
        NetworkMode::Manual => {
            info!("Manual connectivity: starts offline, use 'online' to connect");
            let monitor = Arc::new(ManualNetworkMonitor::new(false));
            manual_network = Some(monitor.clone());
            monitor
        }
        NetworkMode::Probe => {
            let monitor = Arc::new(TcpProbeMonitor::new(
                settings.network.probe_target.clone(),
                settings.probe_interval(),
                settings.probe_timeout(),
            ));
            // First probe before the queue opens, so a start while online drains
            let online = monitor.refresh().await;
            info!(probe_target = %monitor.target(), online, "Initial connectivity probe");
            background.push(monitor.clone().spawn(shutdown_rx.clone()));
            monitor
        }
    };

    // 6. Queue (restores the snapshot, recovers interrupted items)
    let queue = OfflineQueue::open(
        snapshots,
        submitters,
        network,
        Arc::new(UuidProvider),
        time_provider,
        OfflineQueueOptions {
            snapshot_key: settings.storage.snapshot_key.clone(),
            submit_timeout: settings.submit_timeout(),
            ..Default::default()
        },
    )
    .await;

    let stats = queue.stats();
    info!(pending = stats.pending, failed = stats.failed, "Queue ready");

    background.push(queue.watch_connectivity(shutdown_rx));

    // 7. Operator console until quit, EOF or Ctrl+C
    println!("{}", console::HELP);
    tokio::select! {
        _ = run_console(&queue, manual_network.as_deref()) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
    }

    // 8. Graceful shutdown
    info!("Shutting down...");
    shutdown_tx.shutdown();
    for handle in background {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
            warn!("Background task did not stop in time");
        }
    }

    let stats = queue.stats();
    info!(pending = stats.pending, failed = stats.failed, "Shutdown complete");
    Ok(())
}

fn init_logging(format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?;

    match format {
        LogFormat::Json => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

/// Read stdin on a plain thread so a pending read never blocks runtime shutdown
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn run_console(queue: &OfflineQueue, manual_network: Option<&ManualNetworkMonitor>) {
    let mut lines = spawn_stdin_reader();

    while let Some(line) = lines.recv().await {
        let command = match console::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };

        let reply = console::execute(command, queue, manual_network).await;
        println!("{}", reply.text);
        if reply.quit {
            break;
        }
    }
}
