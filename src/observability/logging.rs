//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level from settings, `RUST_LOG` wins when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilitySettings;

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(settings: &ObservabilitySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("config_sync={level},config_syncd={level}", level = settings.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
