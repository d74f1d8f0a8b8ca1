//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → reconciler loop exits → watcher dropped → exit
//! ```
//!
//! # Design Decisions
//! - A cycle in flight finishes before the reconciler observes shutdown
//! - Shutdown is a broadcast so any number of loops can subscribe

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
