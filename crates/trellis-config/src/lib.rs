//! Typed configuration for Trellis.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layered configuration (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use trellis_config::ConfigLoader;
//!
//! # fn main() -> Result<(), trellis_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("trellis.toml")?
//!     .with_env_prefix("TRELLIS")
//!     .load()?;
//!
//! trellis_telemetry::init_telemetry(&config.telemetry).ok();
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! namespace = "shop"
//! version = "v2"
//! template_mode = "per_token"   # or "legacy"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! json_format = true
//!
//! [telemetry.metrics]
//! enabled = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `TRELLIS__API__NAMESPACE=shop`
//! - `TRELLIS__API__VERSION=v2`
//! - `TRELLIS__TELEMETRY__METRICS__ENABLED=true`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{ApiConfig, TrellisConfig};
pub use error::ConfigError;
pub use loader::ConfigLoader;
