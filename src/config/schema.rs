//! Daemon settings schema.
//!
//! All types derive Serde traits for deserialization from the settings file.
//! These are the daemon's own settings, not the synchronised configuration
//! document, which stays untyped.

use serde::{Deserialize, Serialize};

/// Root settings for the config-sync daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Where the synchronised configuration document lives.
    pub source: SourceSettings,

    /// Reconciliation schedule and targets.
    pub reconcile: ReconcileSettings,

    /// Module cache sizing.
    pub cache: CacheSettings,

    /// Logging and metrics.
    pub observability: ObservabilitySettings,
}

/// Configuration document location and refresh policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Path to the document (JSON, or TOML by `.toml` extension).
    pub path: String,

    /// Minimum milliseconds between modification-time checks.
    pub recheck_interval_ms: u64,

    /// Expire the check gate early on filesystem events.
    pub watch: bool,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            path: "/etc/config-sync/autoconf.json".to_string(),
            recheck_interval_ms: 60_000,
            watch: true,
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Seconds between reconciliation cycles.
    pub interval_secs: u64,

    /// Applications hosted by this daemon, each reconciled every cycle.
    pub applications: Vec<String>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            applications: Vec::new(),
        }
    }
}

/// Module cache sizing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Module fragments kept per configuration generation.
    pub max_modules: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { max_modules: 256 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
