//! Configuration synchronisation daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   autoconf.json ──stat/parse──▶ ┌────────────┐   expire   ┌──────────────┐
//!                                 │ FileSource │◀───────────│SourceWatcher │
//!                                 └─────┬──────┘            └──────────────┘
//!                                       │ hash / document
//!                        ┌──────────────┴───────────────┐
//!                        ▼                              ▼
//!                 ┌────────────┐  LocalHandle   ┌───────────────┐
//!                 │ Reconciler │───────────────▶│ ConfigManager │ (one per app)
//!                 │  workers   │ reload/flip/   │ active/staged │
//!                 └────────────┘ record hash    │  LruCache     │
//!                                               └───────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use config_sync::config::{load_settings, Settings};
use config_sync::lifecycle::{signals, Shutdown};
use config_sync::manager::{ConfigManager, LocalTargets};
use config_sync::observability::{logging, metrics};
use config_sync::reconcile::Reconciler;
use config_sync::source::{FileSource, SourceWatcher};

#[derive(Parser)]
#[command(name = "config-syncd")]
#[command(about = "Keeps hosted applications in sync with a shared configuration file", long_about = None)]
struct Cli {
    /// Settings file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    logging::init_logging(&settings.observability);
    tracing::info!("config-syncd v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        source = %settings.source.path,
        recheck_interval_ms = settings.source.recheck_interval_ms,
        reconcile_interval_secs = settings.reconcile.interval_secs,
        applications = settings.reconcile.applications.len(),
        "Settings loaded"
    );

    if settings.observability.metrics_enabled {
        if let Ok(addr) = settings.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let source = Arc::new(FileSource::new(
        &settings.source.path,
        Duration::from_millis(settings.source.recheck_interval_ms),
    ));
    if let Err(e) = source.get_conf() {
        // Not fatal: the file may appear later and the next cycle retries.
        tracing::warn!(error = %e, "Initial configuration load failed");
    }

    let _watcher = if settings.source.watch {
        match SourceWatcher::new(source.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(error = %e, "Configuration watcher unavailable, relying on recheck interval");
                None
            }
        }
    } else {
        None
    };

    let mut targets = LocalTargets::default();
    for application in &settings.reconcile.applications {
        targets.register(Arc::new(ConfigManager::new(
            application.clone(),
            source.clone(),
            settings.cache.max_modules,
        )));
    }
    if targets.is_empty() {
        tracing::warn!("No applications configured; reconciliation cycles will be empty");
    }

    let shutdown = Shutdown::new();
    let reconciler = Reconciler::new(
        source.clone(),
        targets,
        Duration::from_secs(settings.reconcile.interval_secs),
    );
    let reconciler_task = tokio::spawn(reconciler.run(shutdown.subscribe()));

    signals::wait_for_termination().await;
    shutdown.trigger();
    reconciler_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
