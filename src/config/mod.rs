//! Daemon settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → used once at startup to build the source, managers and reconciler
//! ```
//!
//! # Design Decisions
//! - Settings are read once; the synchronised document is what changes at runtime
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, SettingsError};
pub use schema::{CacheSettings, ObservabilitySettings, ReconcileSettings, Settings, SourceSettings};
