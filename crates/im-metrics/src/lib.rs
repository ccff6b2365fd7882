//! Prometheus exporter bootstrap for intern-match binaries.
//!
//! One recorder per process; the port comes from `IM_METRICS_PORT`. Metric
//! names recorded by the API handlers are described here so the scrape
//! endpoint carries help text.

use std::env;
use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn describe_engine_metrics() {
    describe_counter!(
        "im_match_requests_total",
        "Ranking requests received, labelled by direction"
    );
    describe_counter!(
        "im_match_results_total",
        "Ranked results returned across all requests"
    );
    describe_counter!(
        "im_match_rejections_total",
        "Candidates excluded by the eligibility gate"
    );
    describe_histogram!(
        "im_match_duration_seconds",
        "End-to-end ranking request latency"
    );
}

/// Install the Prometheus recorder, listening on `0.0.0.0:<IM_METRICS_PORT>`
/// (or `default_port`). Returns the handle; repeated calls reuse the first
/// exporter.
pub fn init_metrics(default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = env::var("IM_METRICS_PORT")
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(default_port);

    match PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install_recorder()
    {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            describe_engine_metrics();
            info!(metrics_port = port, "started prometheus exporter");
            PROMETHEUS_HANDLE.get()
        }
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to start prometheus exporter");
            PROMETHEUS_HANDLE.get()
        }
    }
}
