//! Observability for Trellis.
//!
//! - **Logging**: structured output via `tracing-subscriber`, JSON or pretty
//! - **Metrics**: Prometheus-format counters via the `metrics` crate
//!
//! The route builder and middleware registry emit events and counters
//! whether or not anything is installed; [`init_telemetry`] decides where
//! they go.
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder().log_level("debug").with_metrics().build();
//! init_telemetry(&config)?;
//!
//! // ... register routes ...
//!
//! println!("{}", trellis_telemetry::render_metrics().unwrap_or_default());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Installs logging, then metrics.
///
/// # Errors
///
/// Returns the first subsystem failure.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
