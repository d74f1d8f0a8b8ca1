//! Versioned configuration file source.
//!
//! # Data Flow
//! ```text
//! get_conf()
//!     → next-check gate (atomic read, no lock)     → not due: cached document
//!     → due: refresh lock, re-check gate
//!     → stat file                                   → missing: NotFound
//!     → mtime changed? read + parse (document.rs)   → broken: Parse, keep old, gate stays open
//!     → swap Arc<ConfigDocument>, advance gate
//!
//! watcher.rs (optional):
//!     file event → expire() → next access re-checks
//! ```
//!
//! # Design Decisions
//! - Documents are immutable and replaced wholesale through `arc-swap`
//! - A failed parse never records the file version as synced
//! - Content hashes cover an application's modules plus the shared ones

pub mod document;
pub mod error;
pub mod file;
pub mod watcher;

pub use document::{ConfigDocument, DocumentError, DocumentFormat, SHARED_APPLICATION};
pub use error::SourceError;
pub use file::FileSource;
pub use watcher::SourceWatcher;
