//! Integration tests for Configuration System

use folio::config::{ConfigLoader, FolioConfig};
use folio::generation::Backoff;
use folio::ModelTier;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use crate::integration::with_xdg_env;

#[test]
fn test_load_from_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("folio.toml");
    fs::write(
        &config_file,
        r#"
[generation]
default_tier = "gemini-3-pro-preview"
max_attempts = 5
backoff = "exponential"
backoff_base_ms = 250

[provider]
api_key = "inline-key"

[logging]
level = "warn"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.generation.tier(), ModelTier::Pro3);
    let policy = config.generation.retry_policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.backoff, Backoff::Exponential);
    assert_eq!(policy.base_delay, Duration::from_millis(250));
    assert_eq!(config.generation.call_timeout(), Duration::from_secs(120));
    assert_eq!(config.provider.resolve_api_key().unwrap(), "inline-key");
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    with_xdg_env(&test_dir, || {
        let global_dir = test_dir.path().join("folio");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join("config.toml"),
            "[generation]\nmax_attempts = 7\ntemperature = 0.2\n",
        )
        .unwrap();

        let workspace = test_dir.path().join("ws");
        fs::create_dir_all(workspace.join("config")).unwrap();
        fs::write(
            workspace.join("config").join("config.toml"),
            "[generation]\nmax_attempts = 4\n",
        )
        .unwrap();
        fs::write(
            workspace.join("config").join("development.toml"),
            "[generation]\ncall_timeout_secs = 30\n",
        )
        .unwrap();

        let config = ConfigLoader::load(&workspace).unwrap();
        assert_eq!(config.generation.max_attempts, 4);
        assert!((config.generation.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.generation.call_timeout_secs, 30);
    });
}

#[test]
fn test_validation_reports_every_problem() {
    let mut config = FolioConfig::default();
    config.generation.default_tier = "gpt-9".to_string();
    config.generation.max_attempts = 0;
    config.provider.base_url = Some("ftp://example".to_string());
    config.logging.output = "both".to_string();

    let errors = config.validate().unwrap_err();
    assert!(errors.len() >= 4, "expected all problems, got {:?}", errors);
    assert!(config.ensure_valid().is_err());
}

#[test]
fn test_default_config_is_valid() {
    let config = FolioConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.generation.tier(), ModelTier::default());
}
