//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Detect duplicate or reserved application names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::Settings;
use crate::source::SHARED_APPLICATION;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("source.path must not be empty")]
    EmptySourcePath,

    #[error("reconcile.interval_secs must be greater than zero")]
    ZeroReconcileInterval,

    #[error("reconcile.applications contains an empty name")]
    EmptyApplication,

    #[error("application {0} is listed more than once")]
    DuplicateApplication(String),

    #[error("application name {0} is reserved for shared modules")]
    ReservedApplication(String),

    #[error("cache.max_modules must be greater than zero")]
    ZeroCacheSize,

    #[error("observability.metrics_address {0} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check `settings`, collecting every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.source.path.trim().is_empty() {
        errors.push(ValidationError::EmptySourcePath);
    }

    if settings.reconcile.interval_secs == 0 {
        errors.push(ValidationError::ZeroReconcileInterval);
    }

    let mut seen = HashSet::new();
    for app in &settings.reconcile.applications {
        if app.trim().is_empty() {
            errors.push(ValidationError::EmptyApplication);
        } else if app == SHARED_APPLICATION {
            errors.push(ValidationError::ReservedApplication(app.clone()));
        } else if !seen.insert(app.as_str()) {
            errors.push(ValidationError::DuplicateApplication(app.clone()));
        }
    }

    if settings.cache.max_modules == 0 {
        errors.push(ValidationError::ZeroCacheSize);
    }

    let observability = &settings.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
