//! Integration tests for Settings loading from config files.
//!
//! These tests run without a global config; environment overrides are
//! covered in config_env_test.rs (separate binary, no env races).

use std::fs;

use tempfile::TempDir;

use orgsync::application::ApplicationError;
use orgsync::config::{CreateFailurePolicy, Settings, DEFAULT_SCOPE};

#[test]
fn given_config_file_when_loading_then_overrides_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orgsync.toml");
    fs::write(
        &path,
        r#"
on_create_failure = "block"

[registry]
base_url = "https://registry.example/api"
token_url = "https://auth.example/token"
client_id = "orgsync"
client_secret = "s3cret"
timeout_secs = 10

[csv]
delimiter = ","
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    assert_eq!(settings.registry.base_url, "https://registry.example/api");
    assert_eq!(settings.registry.timeout_secs, 10);
    assert_eq!(settings.registry.scope, DEFAULT_SCOPE);
    assert_eq!(settings.csv.delimiter, ',');
    assert_eq!(settings.on_create_failure, CreateFailurePolicy::Block);
    assert!(settings.validate_registry().is_ok());
}

#[test]
fn given_missing_config_file_when_loading_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();

    // Act
    let result = Settings::load(Some(temp.path().join("absent.toml").as_path()));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_toml_when_loading_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "[registry\nbase_url = ").unwrap();

    // Act
    let result = Settings::load(Some(path.as_path()));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_partial_registry_settings_when_validating_then_lists_every_missing_key() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orgsync.toml");
    fs::write(&path, "[registry]\nbase_url = \"https://registry.example\"\n").unwrap();
    let settings = Settings::load(Some(path.as_path())).unwrap();

    // Act
    let err = settings.validate_registry().unwrap_err();

    // Assert
    let message = err.to_string();
    assert!(message.contains("registry.token_url"));
    assert!(message.contains("registry.client_id"));
    assert!(message.contains("registry.client_secret"));
    assert!(!message.contains("registry.base_url"));
}

#[test]
fn given_secret_when_showing_config_then_secret_is_masked() {
    // Arrange
    let mut settings = Settings::default();
    settings.registry.client_secret = "hunter2".to_string();

    // Act
    let shown = settings.to_toml().unwrap();

    // Assert
    assert!(!shown.contains("hunter2"));
    assert!(shown.contains("client_secret = \"***\""));
}

#[test]
fn given_template_when_parsed_then_loads_as_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orgsync.toml");
    fs::write(&path, Settings::template()).unwrap();

    // Act
    let settings = Settings::load(Some(path.as_path())).unwrap();

    // Assert
    assert_eq!(settings, Settings::default());
}
