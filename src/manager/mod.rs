//! Application-side configuration manager.
//!
//! # Data Flow
//! ```text
//! reconciler → RemoteProcess (handle.rs)
//!     force_reload  → stage new generation (FileSource → LruCache of modules)
//!     flip          → ArcSwap staged → active
//!     record hash   → applied_hash
//!
//! application code → module(name) → active generation cache
//! ```
//!
//! # Design Decisions
//! - Readers never observe a half-built generation
//! - Module fragments live in a bounded LRU cache per generation; misses
//!   fall back to the generation's document

pub mod config_manager;
pub mod handle;

pub use config_manager::{ConfigManager, LoadEvent};
pub use handle::{LocalHandle, LocalTargets};
