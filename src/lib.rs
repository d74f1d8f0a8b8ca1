//! Configuration synchronisation library.
//!
//! Keeps a fleet of processes in step with a shared configuration file:
//! a bounded LRU cache for parsed fragments, a staleness-gated file
//! source, and a pull-based reconciler that reloads and flips remote
//! processes whose configuration hash has drifted.

pub mod cache;
pub mod config;
pub mod lifecycle;
pub mod manager;
pub mod observability;
pub mod reconcile;
pub mod source;

pub use cache::LruCache;
pub use config::Settings;
pub use lifecycle::Shutdown;
pub use manager::ConfigManager;
pub use reconcile::{ReconcileWorker, Reconciler, RemoteProcess};
pub use source::{ConfigDocument, FileSource};
