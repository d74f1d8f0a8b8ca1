//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_sync_source_checks_total` (counter): modification-time checks
//! - `config_sync_source_reloads_total` (counter): reload attempts by outcome
//! - `config_sync_reconcile_total` (counter): worker outcomes
//! - `config_sync_reconcile_cycle_seconds` (histogram): cycle duration
//! - `config_sync_reconcile_targets` (gauge): targets in the last cycle
//! - `config_sync_generation_flips_total` (counter): flips by application
//! - `config_sync_generation_modules` (gauge): modules in the active generation
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_source_check() {
    metrics::counter!("config_sync_source_checks_total").increment(1);
}

pub fn record_source_reload(outcome: &'static str) {
    metrics::counter!("config_sync_source_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_reconcile_outcome(outcome: &'static str) {
    metrics::counter!("config_sync_reconcile_total", "outcome" => outcome).increment(1);
}

pub fn record_reconcile_cycle(elapsed: Duration, targets: usize) {
    metrics::histogram!("config_sync_reconcile_cycle_seconds").record(elapsed.as_secs_f64());
    metrics::gauge!("config_sync_reconcile_targets").set(targets as f64);
}

pub fn record_generation_flip(application: &str, modules: usize) {
    let application = application.to_string();
    metrics::counter!("config_sync_generation_flips_total", "application" => application.clone())
        .increment(1);
    metrics::gauge!("config_sync_generation_modules", "application" => application)
        .set(modules as f64);
}
