//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lambda_dev_requests_total` (counter): requests by response status
//! - `lambda_dev_invocation_duration_seconds` (histogram): handler latency
//! - `lambda_dev_invocation_failures_total` (counter): failures by kind
//! - `lambda_dev_handler_reloads_total` (counter): successful (re)loads
//! - `lambda_dev_handler_load_failures_total` (counter): failed loads
//! - `lambda_dev_builds_total` (counter): builds by outcome
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "lambda_dev_requests_total";
pub const INVOCATION_DURATION: &str = "lambda_dev_invocation_duration_seconds";
pub const INVOCATION_FAILURES: &str = "lambda_dev_invocation_failures_total";
pub const HANDLER_RELOADS: &str = "lambda_dev_handler_reloads_total";
pub const HANDLER_LOAD_FAILURES: &str = "lambda_dev_handler_load_failures_total";
pub const BUILDS_TOTAL: &str = "lambda_dev_builds_total";

/// Install the Prometheus exporter on `addr` and describe all metrics.
///
/// Failure is logged, not fatal; the dev loop works without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            describe_counter!(REQUESTS_TOTAL, "Requests served, by status");
            describe_histogram!(INVOCATION_DURATION, "Handler invocation latency in seconds");
            describe_counter!(INVOCATION_FAILURES, "Failed handler invocations, by kind");
            describe_counter!(HANDLER_RELOADS, "Successful handler (re)loads");
            describe_counter!(HANDLER_LOAD_FAILURES, "Failed handler loads");
            describe_counter!(BUILDS_TOTAL, "Build subprocess runs, by outcome");
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        }
    }
}

pub fn record_request(status: u16) {
    counter!(REQUESTS_TOTAL, "status" => status.to_string()).increment(1);
}

pub fn record_invocation(start: Instant) {
    histogram!(INVOCATION_DURATION).record(start.elapsed().as_secs_f64());
}

pub fn record_invocation_failure(kind: &'static str) {
    counter!(INVOCATION_FAILURES, "kind" => kind).increment(1);
}

pub fn record_reload() {
    counter!(HANDLER_RELOADS).increment(1);
}

pub fn record_load_failure() {
    counter!(HANDLER_LOAD_FAILURES).increment(1);
}

pub fn record_build(outcome: &'static str) {
    counter!(BUILDS_TOTAL, "outcome" => outcome).increment(1);
}
