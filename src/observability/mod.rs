//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! server, loader, watcher, harness produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → the developer's terminal (pretty) or log tooling (JSON)
//!     → optional Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;

use crate::config::ObservabilityConfig;

/// Install logging, and the metrics exporter when enabled.
pub fn init(config: &ObservabilityConfig) {
    logging::init_logging(config);

    if config.metrics_enabled {
        match config.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }
}
