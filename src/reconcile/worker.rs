//! Single-target reconciliation worker.
//!
//! # Responsibilities
//! - Compare the local configuration hash with the one a remote serves
//! - On mismatch: reload, flip, then record the hash, strictly in that order
//! - Capture any failure as the worker's cause instead of returning it
//! - Always close the remote handle, ignoring close errors

use std::sync::Arc;

use thiserror::Error;

use crate::observability::metrics;
use crate::reconcile::remote::{RemoteError, RemoteProcess};
use crate::source::{FileSource, SourceError};

/// Why a reconciliation cycle failed for a target.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Result of a worker's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `execute` has not run yet.
    Pending,
    /// Hashes matched; nothing was pushed.
    InSync,
    /// The remote reloaded, flipped and recorded the new hash.
    Updated,
    /// A step failed; see the cause.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::InSync => "in_sync",
            Outcome::Updated => "updated",
            Outcome::Failed => "failed",
        }
    }
}

/// Reconciles one remote process for one cycle.
pub struct ReconcileWorker<R> {
    source: Arc<FileSource>,
    /// `None` once the handle was closed.
    remote: Option<R>,
    identity: Option<String>,
    local_hash: Option<u64>,
    outcome: Outcome,
    cause: Option<ReconcileError>,
}

impl<R: RemoteProcess> ReconcileWorker<R> {
    pub fn new(source: Arc<FileSource>, remote: R) -> Self {
        Self {
            source,
            remote: Some(remote),
            identity: None,
            local_hash: None,
            outcome: Outcome::Pending,
            cause: None,
        }
    }

    /// Run the cycle. Always returns `true`; inspect [`Self::has_errors`]
    /// and [`Self::cause`] afterwards.
    pub async fn execute(&mut self) -> bool {
        let Some(mut remote) = self.remote.take() else {
            tracing::warn!(identity = ?self.identity, "Reconcile worker executed after its handle was closed");
            if self.cause.is_none() {
                self.cause = Some(RemoteError::Closed.into());
            }
            self.outcome = Outcome::Failed;
            return true;
        };

        match self.sync(&mut remote).await {
            Ok(outcome) => self.outcome = outcome,
            Err(e) => {
                tracing::warn!(identity = ?self.identity, error = %e, "Reconciliation failed");
                self.outcome = Outcome::Failed;
                self.cause = Some(e);
            }
        }

        if let Err(e) = remote.close().await {
            tracing::debug!(identity = ?self.identity, error = %e, "Ignoring error closing remote handle");
        }

        metrics::record_reconcile_outcome(self.outcome.as_str());
        true
    }

    async fn sync(&mut self, remote: &mut R) -> Result<Outcome, ReconcileError> {
        let identity = remote.identity().await?;
        self.identity = Some(identity.clone());

        let local_hash = self.source.config_hash(&identity)?;
        self.local_hash = Some(local_hash);

        let applied_hash = remote.applied_hash().await?;
        if local_hash == applied_hash {
            tracing::debug!(identity = %identity, hash = local_hash, "Remote configuration up to date");
            return Ok(Outcome::InSync);
        }

        tracing::info!(
            identity = %identity,
            local_hash,
            applied_hash,
            "Loading application with new configuration"
        );
        remote.force_reload(&identity).await?;
        remote.flip_active_generation().await?;
        remote.record_applied_hash(local_hash).await?;
        Ok(Outcome::Updated)
    }

    /// The failure captured by the last `execute`, if any.
    pub fn cause(&self) -> Option<&ReconcileError> {
        self.cause.as_ref()
    }

    pub fn has_errors(&self) -> bool {
        self.cause.is_some()
    }

    /// Identity reported by the remote, once queried.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Local hash computed for the remote's identity, once computed.
    pub fn local_hash(&self) -> Option<u64> {
        self.local_hash
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Consume the worker into a report, moving the cause out.
    pub fn into_report(self) -> TargetReport {
        TargetReport {
            identity: self.identity,
            local_hash: self.local_hash,
            outcome: self.outcome,
            cause: self.cause,
        }
    }
}

/// What happened to one target during a cycle.
#[derive(Debug)]
pub struct TargetReport {
    pub identity: Option<String>,
    pub local_hash: Option<u64>,
    pub outcome: Outcome,
    pub cause: Option<ReconcileError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Identity,
        AppliedHash,
        Reload(String),
        Flip,
        Record(u64),
        Close,
    }

    struct MockRemote {
        identity: Result<String, ()>,
        applied: u64,
        fail_reload: bool,
        fail_close: bool,
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl MockRemote {
        fn new(identity: &str, applied: u64) -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let remote = Self {
                identity: Ok(identity.to_string()),
                applied,
                fail_reload: false,
                fail_close: false,
                calls: calls.clone(),
            };
            (remote, calls)
        }

        fn log(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl RemoteProcess for MockRemote {
        async fn identity(&mut self) -> Result<String, RemoteError> {
            self.log(Call::Identity);
            self.identity
                .clone()
                .map_err(|_| RemoteError::Unreachable("connection refused".into()))
        }

        async fn applied_hash(&mut self) -> Result<u64, RemoteError> {
            self.log(Call::AppliedHash);
            Ok(self.applied)
        }

        async fn force_reload(&mut self, identity: &str) -> Result<(), RemoteError> {
            self.log(Call::Reload(identity.to_string()));
            if self.fail_reload {
                return Err(RemoteError::Timeout(Duration::from_secs(5)));
            }
            Ok(())
        }

        async fn flip_active_generation(&mut self) -> Result<(), RemoteError> {
            self.log(Call::Flip);
            Ok(())
        }

        async fn record_applied_hash(&mut self, hash: u64) -> Result<(), RemoteError> {
            self.log(Call::Record(hash));
            self.applied = hash;
            Ok(())
        }

        async fn close(&mut self) -> Result<(), RemoteError> {
            self.log(Call::Close);
            if self.fail_close {
                return Err(RemoteError::Unreachable("already gone".into()));
            }
            Ok(())
        }
    }

    fn source(dir: &tempfile::TempDir) -> Arc<FileSource> {
        let path = dir.path().join("autoconf.json");
        std::fs::write(&path, r#"{"Imap": {"Pool": {"size": 8}}}"#).unwrap();
        Arc::new(FileSource::new(path, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_in_sync_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let hash = source.config_hash("Imap").unwrap();
        let (remote, calls) = MockRemote::new("Imap", hash);

        let mut worker = ReconcileWorker::new(source, remote);
        assert!(worker.execute().await);

        assert!(!worker.has_errors());
        assert_eq!(worker.outcome(), Outcome::InSync);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![Call::Identity, Call::AppliedHash, Call::Close]
        );
    }

    #[tokio::test]
    async fn test_mismatch_reloads_flips_records() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let hash = source.config_hash("Imap").unwrap();
        let (remote, calls) = MockRemote::new("Imap", hash.wrapping_add(1));

        let mut worker = ReconcileWorker::new(source, remote);
        assert!(worker.execute().await);

        assert!(!worker.has_errors());
        assert_eq!(worker.outcome(), Outcome::Updated);
        assert_eq!(worker.identity(), Some("Imap"));
        assert_eq!(worker.local_hash(), Some(hash));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Identity,
                Call::AppliedHash,
                Call::Reload("Imap".into()),
                Call::Flip,
                Call::Record(hash),
                Call::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_identity_failure_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let (mut remote, calls) = MockRemote::new("Imap", 0);
        remote.identity = Err(());

        let mut worker = ReconcileWorker::new(source(&dir), remote);
        assert!(worker.execute().await);

        assert!(worker.has_errors());
        assert!(matches!(
            worker.cause(),
            Some(ReconcileError::Remote(RemoteError::Unreachable(_)))
        ));
        assert_eq!(*calls.lock().unwrap(), vec![Call::Identity, Call::Close]);
    }

    #[tokio::test]
    async fn test_reload_failure_stops_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let (mut remote, calls) = MockRemote::new("Imap", 0);
        remote.fail_reload = true;

        let mut worker = ReconcileWorker::new(source(&dir), remote);
        worker.execute().await;

        assert!(matches!(
            worker.cause(),
            Some(ReconcileError::Remote(RemoteError::Timeout(_)))
        ));
        let calls = calls.lock().unwrap();
        assert!(!calls.contains(&Call::Flip));
        assert_eq!(calls.last(), Some(&Call::Close));
    }

    #[tokio::test]
    async fn test_close_error_does_not_mask_result() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let hash = source.config_hash("Imap").unwrap();

        let (mut remote, _) = MockRemote::new("Imap", hash);
        remote.fail_close = true;
        let mut worker = ReconcileWorker::new(source.clone(), remote);
        worker.execute().await;
        assert!(!worker.has_errors());

        let (mut remote, _) = MockRemote::new("Imap", 0);
        remote.identity = Err(());
        remote.fail_close = true;
        let mut worker = ReconcileWorker::new(source, remote);
        worker.execute().await;
        assert!(matches!(
            worker.cause(),
            Some(ReconcileError::Remote(RemoteError::Unreachable(reason))) if reason == "connection refused"
        ));
    }

    #[tokio::test]
    async fn test_missing_source_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FileSource::new(dir.path().join("nope.json"), Duration::ZERO));
        let (remote, calls) = MockRemote::new("Imap", 0);

        let mut worker = ReconcileWorker::new(source, remote);
        worker.execute().await;

        assert!(matches!(
            worker.cause(),
            Some(ReconcileError::Source(SourceError::NotFound { .. }))
        ));
        assert_eq!(*calls.lock().unwrap(), vec![Call::Identity, Call::Close]);
    }

    #[tokio::test]
    async fn test_second_execute_reports_closed() {
        let dir = tempfile::tempdir().unwrap();
        let source = source(&dir);
        let hash = source.config_hash("Imap").unwrap();
        let (remote, calls) = MockRemote::new("Imap", hash);

        let mut worker = ReconcileWorker::new(source, remote);
        worker.execute().await;
        worker.execute().await;

        assert!(matches!(
            worker.cause(),
            Some(ReconcileError::Remote(RemoteError::Closed))
        ));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }
}
