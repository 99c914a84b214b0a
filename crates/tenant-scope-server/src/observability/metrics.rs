//! Prometheus metrics for tenant-scope-server

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tenant_scope::ContextBuildError;

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "tenant_scope_uptime_seconds";
const METRIC_INFO: &str = "tenant_scope_info";
const METRIC_REQUESTS: &str = "tenant_scope_requests_total";
const METRIC_REQUEST_DURATION: &str = "tenant_scope_request_duration_seconds";

// Context metrics
const METRIC_CONTEXTS_BUILT: &str = "tenant_scope_contexts_built_total";
const METRIC_CONTEXTS_REJECTED: &str = "tenant_scope_contexts_rejected_total";

// Handle metrics
const METRIC_HANDLE_OPS: &str = "tenant_scope_handle_operations_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");
    describe_counter!(METRIC_REQUESTS, "Total HTTP requests on entity routes");
    describe_histogram!(METRIC_REQUEST_DURATION, "Entity route latency in seconds");

    describe_counter!(METRIC_CONTEXTS_BUILT, "Request contexts built");
    describe_counter!(
        METRIC_CONTEXTS_REJECTED,
        "Request contexts refused, by reason"
    );

    describe_counter!(METRIC_HANDLE_OPS, "Data handle operations by outcome");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a handled entity request.
pub fn record_request(route: &str, status: u16, duration: Duration) {
    counter!(
        METRIC_REQUESTS,
        "route" => route.to_owned(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(METRIC_REQUEST_DURATION, "route" => route.to_owned())
        .record(duration.as_secs_f64());
}

pub fn record_context_built() {
    counter!(METRIC_CONTEXTS_BUILT).increment(1);
}

/// Record a refused context build. The tenant is never used as a label.
pub fn record_context_rejected(error: &ContextBuildError) {
    let reason = match error {
        ContextBuildError::MissingTenant => "missing_tenant",
        ContextBuildError::MalformedTenant { .. } => "malformed_tenant",
        ContextBuildError::MissingUser => "missing_user",
        ContextBuildError::HandleReused { .. } => "handle_reused",
        ContextBuildError::EntityMismatch { .. } => "entity_mismatch",
    };
    counter!(METRIC_CONTEXTS_REJECTED, "reason" => reason.to_owned()).increment(1);
}

/// Record a data handle operation.
pub fn record_handle_op(entity: &str, op: &str, outcome: &str) {
    counter!(
        METRIC_HANDLE_OPS,
        "entity" => entity.to_owned(),
        "op" => op.to_owned(),
        "outcome" => outcome.to_owned(),
    )
    .increment(1);
}
