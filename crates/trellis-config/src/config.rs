//! Configuration types.
//!
//! [`TrellisConfig`] is the root; [`ApiConfig`] supplies the namespace and
//! version every route is registered under, and the telemetry section is
//! [`trellis_telemetry::TelemetryConfig`] as-is.

use serde::Deserialize;
use trellis_core::ApiNamespace;
use trellis_router::TemplateMode;
use trellis_telemetry::{create_env_filter, LogConfig, TelemetryConfig};

use crate::ConfigError;

/// Complete Trellis configuration.
///
/// # Example
///
/// ```
/// use trellis_config::TrellisConfig;
/// use trellis_core::ApiNamespace;
///
/// let config = TrellisConfig::default();
/// assert_eq!(config.api.route_base(), "/api/v1/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrellisConfig {
    /// Namespace, version and template settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TrellisConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `api.namespace` is empty or contains `/` or whitespace
    /// - `api.version` is set but empty or contains `/`
    /// - `telemetry.logging.level` is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let namespace = &self.api.namespace;
        if namespace.is_empty() {
            return Err(ConfigError::invalid_value("api.namespace", "must not be empty"));
        }
        if namespace.contains('/') || namespace.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid_value(
                "api.namespace",
                format!("must not contain '/' or whitespace: {namespace:?}"),
            ));
        }

        if let Some(version) = &self.api.version {
            if version.is_empty() {
                return Err(ConfigError::invalid_value(
                    "api.version",
                    "must not be empty; set it to null for an unversioned API",
                ));
            }
            if version.contains('/') {
                return Err(ConfigError::invalid_value(
                    "api.version",
                    format!("must not contain '/': {version:?}"),
                ));
            }
        }

        create_env_filter(&self.telemetry.logging.level).map_err(|e| {
            ConfigError::invalid_value("telemetry.logging.level", e.to_string())
        })?;

        Ok(())
    }

    /// Development preset: pretty debug logs.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_config::TrellisConfig;
    ///
    /// let config = TrellisConfig::development();
    /// assert!(!config.telemetry.logging.json_format);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            api: ApiConfig::default(),
            telemetry: TelemetryConfig {
                logging: LogConfig::development(),
                ..TelemetryConfig::default()
            },
        }
    }

    /// Production preset: JSON logs and the Prometheus recorder.
    #[must_use]
    pub fn production() -> Self {
        Self {
            api: ApiConfig::default(),
            telemetry: TelemetryConfig::builder()
                .logging(LogConfig::production())
                .with_metrics()
                .build(),
        }
    }
}

/// The `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// API family, the first path segment of every route.
    pub namespace: String,

    /// Release line, the second path segment when set.
    pub version: Option<String>,

    /// How path templates are compiled.
    pub template_mode: TemplateMode,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            namespace: "api".to_string(),
            version: Some("v1".to_string()),
            template_mode: TemplateMode::PerToken,
        }
    }
}

impl ApiNamespace for ApiConfig {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_api(namespace: &str, version: Option<&str>) -> TrellisConfig {
        TrellisConfig {
            api: ApiConfig {
                namespace: namespace.to_string(),
                version: version.map(str::to_string),
                template_mode: TemplateMode::PerToken,
            },
            ..TrellisConfig::default()
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(TrellisConfig::default().validate().is_ok());
        assert!(TrellisConfig::development().validate().is_ok());
        assert!(TrellisConfig::production().validate().is_ok());
    }

    #[test]
    fn test_namespace_rules() {
        assert!(with_api("shop", Some("v2")).validate().is_ok());
        assert!(with_api("", Some("v2")).validate().is_err());
        assert!(with_api("shop/admin", None).validate().is_err());
        assert!(with_api("my shop", None).validate().is_err());
    }

    #[test]
    fn test_version_rules() {
        assert!(with_api("shop", None).validate().is_ok());
        assert!(with_api("shop", Some("")).validate().is_err());
        assert!(with_api("shop", Some("v2/beta")).validate().is_err());
    }

    #[test]
    fn test_log_level_rule() {
        let mut config = TrellisConfig::default();
        config.telemetry.logging.level = "trellis=loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("telemetry.logging.level"));
    }

    #[test]
    fn test_api_config_is_namespace() {
        assert_eq!(with_api("shop", Some("v2")).api.route_base(), "/shop/v2/");
        assert_eq!(with_api("shop", None).api.route_base(), "/shop/");
    }

    #[test]
    fn test_production_enables_metrics() {
        assert!(TrellisConfig::production().telemetry.metrics.enabled);
    }
}
