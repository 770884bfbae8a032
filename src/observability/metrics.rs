//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tools_rate_limited_total` (counter): rejected attempts by action
//! - `tools_rate_limit_swept_total` (counter): expired buckets removed
//! - `tools_submissions_total` (counter): submissions by kind (free, paid)
//! - `tools_score_resolutions_total` (counter): recommended score source
//! - `tools_store_fallbacks_total` (counter): fail-open reads by what failed
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rate_limited(action: &'static str) {
    counter!("tools_rate_limited_total", "action" => action).increment(1);
}

pub fn record_sweep(removed: usize) {
    counter!("tools_rate_limit_swept_total").increment(removed as u64);
}

pub fn record_submission(kind: &'static str) {
    counter!("tools_submissions_total", "kind" => kind).increment(1);
}

pub fn record_score_resolution(source: &'static str) {
    counter!("tools_score_resolutions_total", "source" => source).increment(1);
}

pub fn record_store_fallback(what: &'static str) {
    counter!("tools_store_fallbacks_total", "what" => what).increment(1);
}
