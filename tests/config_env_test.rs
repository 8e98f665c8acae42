//! Environment-variable overrides for Settings.
//!
//! Kept in its own test binary: it mutates process environment.

use std::env;
use std::fs;

use tempfile::TempDir;

use orgsync::application::ApplicationError;
use orgsync::config::{CreateFailurePolicy, Settings};

#[test]
fn given_env_overrides_when_loading_then_env_wins_over_file() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orgsync.toml");
    fs::write(
        &path,
        "[registry]\nclient_secret = \"from-file\"\ntimeout_secs = 10\n",
    )
    .unwrap();
    env::set_var("ORGSYNC_REGISTRY__CLIENT_SECRET", "from-env");
    env::set_var("ORGSYNC_REGISTRY__RATE_LIMIT_RPS", "2.5");
    env::set_var("ORGSYNC_ON_CREATE_FAILURE", "block");

    // Act
    let settings = Settings::load(Some(path.as_path()));

    // Cleanup before asserting so a failure leaves no residue
    env::remove_var("ORGSYNC_REGISTRY__CLIENT_SECRET");
    env::remove_var("ORGSYNC_REGISTRY__RATE_LIMIT_RPS");
    env::remove_var("ORGSYNC_ON_CREATE_FAILURE");

    // Assert
    let settings = settings.unwrap();
    assert_eq!(settings.registry.client_secret, "from-env");
    assert_eq!(settings.registry.timeout_secs, 10);
    assert_eq!(settings.registry.rate_limit_rps, Some(2.5));
    assert_eq!(settings.on_create_failure, CreateFailurePolicy::Block);

    // Invalid values are rejected
    env::set_var("ORGSYNC_CSV__DELIMITER", ";;");
    let result = Settings::load(None);
    env::remove_var("ORGSYNC_CSV__DELIMITER");
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}
