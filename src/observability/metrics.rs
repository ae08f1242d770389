//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): requests by verdict (pass, block, disabled)
//! - `shield_rule_matches_total` (counter): matched rules by action
//! - `shield_rule_mutations_total` (counter): registry writes by operation
//! - `shield_persist_failures_total` (counter): swallowed auto-persist failures
//! - `shield_rules_active` (gauge): rules currently loaded
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_verdict(verdict: &'static str) {
    ::metrics::counter!("shield_requests_total", "verdict" => verdict).increment(1);
}

pub fn record_rule_match(action: &str) {
    ::metrics::counter!("shield_rule_matches_total", "action" => action.to_string()).increment(1);
}

pub fn record_rule_mutation(op: &'static str) {
    ::metrics::counter!("shield_rule_mutations_total", "op" => op).increment(1);
}

pub fn record_persist_failure() {
    ::metrics::counter!("shield_persist_failures_total").increment(1);
}

pub fn set_active_rules(count: usize) {
    ::metrics::gauge!("shield_rules_active").set(count as f64);
}
