//! Remote process capability.
//!
//! How a handle reaches its process (RPC, HTTP, local IPC) is up to the
//! implementation; the reconciliation logic only sees this trait.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure talking to a remote process.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The process could not be reached.
    #[error("remote process unreachable: {0}")]
    Unreachable(String),

    /// The call did not complete in time.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The process answered but refused the operation.
    #[error("remote process rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// The handle was already closed.
    #[error("remote handle is closed")]
    Closed,
}

/// A handle to one remote process whose configuration is kept in sync.
///
/// Calls may block on I/O; implementations carry their own timeouts and
/// report them as [`RemoteError::Timeout`].
#[async_trait]
pub trait RemoteProcess: Send {
    /// The application name the process reports for itself.
    async fn identity(&mut self) -> Result<String, RemoteError>;

    /// Hash of the configuration the process currently serves.
    async fn applied_hash(&mut self) -> Result<u64, RemoteError>;

    /// Reload configuration for `identity` into a staged generation.
    async fn force_reload(&mut self, identity: &str) -> Result<(), RemoteError>;

    /// Atomically make the staged generation the active one.
    async fn flip_active_generation(&mut self) -> Result<(), RemoteError>;

    /// Record `hash` as the configuration now being served.
    async fn record_applied_hash(&mut self, hash: u64) -> Result<(), RemoteError>;

    /// Release the handle. Errors are reported but callers may ignore them.
    async fn close(&mut self) -> Result<(), RemoteError>;
}
