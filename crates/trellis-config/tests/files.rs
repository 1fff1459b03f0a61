//! File and dotenv loading.

use std::io::Write;

use tempfile::{Builder, NamedTempFile};
use trellis_config::{ConfigError, ConfigLoader};
use trellis_core::ApiNamespace;
use trellis_router::TemplateMode;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_file() {
    let file = temp_file(
        ".toml",
        r#"
            [api]
            namespace = "shop"
            version = "v2"
            template_mode = "legacy"

            [telemetry.logging]
            level = "trellis_router=trace"
            json_format = false
        "#,
    );

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.api.route_base(), "/shop/v2/");
    assert_eq!(config.api.template_mode, TemplateMode::Legacy);
    assert!(!config.telemetry.logging.json_format);
}

#[test]
fn test_json_file() {
    let file = temp_file(".json", r#"{"api": {"namespace": "billing"}}"#);

    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    assert_eq!(config.api.route_base(), "/billing/v1/");
}

#[test]
fn test_unknown_extension() {
    let file = temp_file(".yaml", "api: {}");
    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = ConfigLoader::new().with_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));

    let config = ConfigLoader::new()
        .with_optional_file(&path)
        .unwrap()
        .load()
        .unwrap();
    assert_eq!(config.api.namespace, "api");
}

#[test]
fn test_dotenv_file_feeds_env_overrides() {
    let env_file = temp_file(
        ".env",
        "TRELLIS_FILES_TEST__API__NAMESPACE=warehouse\nTRELLIS_FILES_TEST__API__VERSION=\n",
    );

    let config = ConfigLoader::new()
        .with_dotenv_file(env_file.path())
        .unwrap()
        .with_env_prefix("trellis_files_test")
        .load()
        .unwrap();

    assert_eq!(config.api.route_base(), "/warehouse/");
}
