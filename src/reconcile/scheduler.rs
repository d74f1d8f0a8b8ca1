//! Periodic reconciliation across all known remote processes.
//!
//! # Responsibilities
//! - Ask a [`TargetProvider`] for one fresh handle per remote process
//! - Run one [`ReconcileWorker`] per handle, all concurrently
//! - Report per-target outcomes; a failing target never aborts the batch

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time;
use uuid::Uuid;

use crate::observability::metrics;
use crate::reconcile::remote::{RemoteError, RemoteProcess};
use crate::reconcile::worker::{Outcome, ReconcileWorker, TargetReport};
use crate::source::FileSource;

/// Discovers the remote processes to reconcile.
#[async_trait]
pub trait TargetProvider: Send + Sync {
    type Remote: RemoteProcess;

    /// One newly opened handle per known process. Each handle is closed by
    /// its worker at the end of the cycle.
    async fn targets(&self) -> Result<Vec<Self::Remote>, RemoteError>;
}

/// Outcome of one reconciliation cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub elapsed: Duration,
    pub targets: Vec<TargetReport>,
}

impl CycleReport {
    fn count(&self, outcome: Outcome) -> usize {
        self.targets.iter().filter(|t| t.outcome == outcome).count()
    }

    pub fn updated(&self) -> usize {
        self.count(Outcome::Updated)
    }

    pub fn in_sync(&self) -> usize {
        self.count(Outcome::InSync)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failed)
    }
}

/// Drives reconciliation cycles.
pub struct Reconciler<P> {
    source: Arc<FileSource>,
    provider: P,
    interval: Duration,
}

impl<P: TargetProvider> Reconciler<P> {
    pub fn new(source: Arc<FileSource>, provider: P, interval: Duration) -> Self {
        Self {
            source,
            provider,
            interval,
        }
    }

    /// Run a single cycle over every target the provider yields.
    pub async fn run_cycle(&self) -> Result<CycleReport, RemoteError> {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        let remotes = self.provider.targets().await?;

        tracing::debug!(cycle_id = %cycle_id, targets = remotes.len(), "Reconciliation cycle starting");

        let workers = remotes.into_iter().map(|remote| {
            let mut worker = ReconcileWorker::new(self.source.clone(), remote);
            async move {
                worker.execute().await;
                worker.into_report()
            }
        });
        let targets = join_all(workers).await;

        let report = CycleReport {
            cycle_id,
            elapsed: started.elapsed(),
            targets,
        };
        metrics::record_reconcile_cycle(report.elapsed, report.targets.len());

        for target in report.targets.iter().filter(|t| t.cause.is_some()) {
            tracing::warn!(
                cycle_id = %cycle_id,
                identity = ?target.identity,
                error = ?target.cause,
                "Target left out of sync this cycle"
            );
        }
        tracing::info!(
            cycle_id = %cycle_id,
            updated = report.updated(),
            in_sync = report.in_sync(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Reconciliation cycle complete"
        );
        Ok(report)
    }

    /// Repeat cycles every interval until shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            source = %self.source.path().display(),
            "Reconciler starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "Failed to discover reconciliation targets");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reconciler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
