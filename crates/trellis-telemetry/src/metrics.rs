//! Prometheus metrics for Trellis.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `trellis_routes_registered_total` | Counter | `method` | Endpoints handed to the registry |
//! | `trellis_permission_checks_total` | Counter | `result` | Middleware gate decisions |
//! | `trellis_unknown_callbacks_total` | Counter | - | Requests answered with `unknown_callback` |
//!
//! Recording is a no-op until a recorder is installed, so libraries can
//! record unconditionally and applications opt in with [`init_metrics`].

use std::sync::OnceLock;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Metric names.
pub mod names {
    /// Counter of registered endpoints.
    pub const ROUTES_REGISTERED: &str = "trellis_routes_registered_total";
    /// Counter of permission decisions.
    pub const PERMISSION_CHECKS: &str = "trellis_permission_checks_total";
    /// Counter of unknown-callback replies.
    pub const UNKNOWN_CALLBACKS: &str = "trellis_unknown_callbacks_total";
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// No HTTP listener is started; call [`render_metrics`] to expose the text
/// format through whatever server the application already runs.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if a global recorder is already set.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if [`init_metrics`] has not installed a recorder.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        names::ROUTES_REGISTERED,
        "Total number of endpoints handed to the endpoint registry"
    );
    describe_counter!(
        names::PERMISSION_CHECKS,
        "Total middleware permission decisions by result"
    );
    describe_counter!(
        names::UNKNOWN_CALLBACKS,
        "Total requests answered with the unknown_callback payload"
    );
}

/// Records one registered endpoint.
pub fn record_route_registered(method: &str) {
    counter!(names::ROUTES_REGISTERED, "method" => method.to_string()).increment(1);
}

/// Records a permission decision.
pub fn record_permission_check(allowed: bool) {
    let result = if allowed { "allowed" } else { "denied" };
    counter!(names::PERMISSION_CHECKS, "result" => result).increment(1);
}

/// Records a request answered with the unknown-callback payload.
pub fn record_unknown_callback() {
    counter!(names::UNKNOWN_CALLBACKS).increment(1);
}
