//! Prometheus metrics infrastructure

use std::sync::Arc;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Handle onto the installed Prometheus recorder
#[derive(Clone)]
pub struct GradingMetrics {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for GradingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradingMetrics").finish_non_exhaustive()
    }
}

impl GradingMetrics {
    /// Current metrics in the Prometheus text format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Help text for every metric the orchestrator records
pub fn describe_metrics() {
    describe_counter!(
        "grading_items_total",
        "Items that finished grading, labelled by status and error kind"
    );
    describe_counter!(
        "grading_retries_total",
        "Attempts that failed with a retryable error, labelled by error kind"
    );
    describe_counter!(
        "grading_cache_hits_total",
        "Model responses served from the response cache"
    );
    describe_histogram!(
        "grading_item_duration_seconds",
        Unit::Seconds,
        "Wall time spent on one item, retries and backoff included"
    );
    describe_gauge!("rubric_grader_info", "Build information");
}

/// Install the global Prometheus recorder the grading counters report to
pub fn init_metrics(config: &MetricsConfig) -> Option<GradingMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_metrics();
            gauge!("rubric_grader_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized");
            Some(GradingMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}
