//! Cross-process reconciliation.
//!
//! # Data Flow
//! ```text
//! Reconciler (scheduler.rs), every interval:
//!     TargetProvider → one RemoteProcess handle per process
//!     → ReconcileWorker per handle (worker.rs), run concurrently
//!         identity → local hash (FileSource) → applied hash
//!         equal:  done
//!         differ: force_reload → flip → record_applied_hash
//!         always: close handle
//!     → CycleReport
//! ```
//!
//! # Design Decisions
//! - Pull-based, one worker per target per cycle, no retries inside a cycle
//! - Worker failures are captured, never propagated to the batch
//! - Transport lives behind the `RemoteProcess` trait (remote.rs)

pub mod remote;
pub mod scheduler;
pub mod worker;

pub use remote::{RemoteError, RemoteProcess};
pub use scheduler::{CycleReport, Reconciler, TargetProvider};
pub use worker::{Outcome, ReconcileError, ReconcileWorker, TargetReport};
