//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatcher metrics (requests, latency, in-flight, table size)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by verb and outcome
//! - `dispatch_duration_seconds` (histogram): end-to-end handling latency
//! - `dispatch_in_flight` (gauge): requests currently being handled
//! - `route_table_size` (gauge): routes in the active table
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels are low-cardinality: verb and outcome only, never the path

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// How a request left the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A route matched and completed.
    Handled,
    /// No route matched.
    Unmatched,
    /// Dispatch propagated an error.
    Failed,
    /// Served from the static asset directory.
    Static,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Handled => "handled",
            RequestOutcome::Unmatched => "unmatched",
            RequestOutcome::Failed => "failed",
            RequestOutcome::Static => "static",
        }
    }
}

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(verb: &str, outcome: RequestOutcome) {
    counter!(
        "dispatch_requests_total",
        "verb" => verb.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn request_started() {
    gauge!("dispatch_in_flight").increment(1.0);
}

pub fn request_finished(started: Instant) {
    gauge!("dispatch_in_flight").decrement(1.0);
    histogram!("dispatch_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn set_route_table_size(routes: usize) {
    gauge!("route_table_size").set(routes as f64);
}
