//! Config environment variable tests
//!
//! These tests verify that Config::from_env() correctly reads and applies
//! environment variable overrides. Config::from_env() also loads a .env file
//! via dotenvy, so the tests set every variable they assert on.
//!
//! Tests use #[serial] to prevent race conditions with shared env vars.

use impact_rating::config::{Config, DatabaseConfig, LogFormat};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_config_from_env_loads_successfully() {
    let result = Config::from_env();
    assert!(result.is_ok(), "Config::from_env() should succeed with defaults");
}

#[test]
#[serial]
fn test_config_unset_database_uses_defaults() {
    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");

    let config = Config::from_env().unwrap();
    let defaults = DatabaseConfig::default();
    assert_eq!(config.database.path, defaults.path);
    assert_eq!(config.database.max_connections, defaults.max_connections);
    assert_eq!(defaults.path.to_str().unwrap(), "./data/impact.db");
}

#[test]
#[serial]
fn test_config_from_env_custom_database() {
    env::set_var("DATABASE_PATH", "/custom/impact.db");
    env::set_var("DATABASE_MAX_CONNECTIONS", "10");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.path.to_str().unwrap(), "/custom/impact.db");
    assert_eq!(config.database.max_connections, 10);

    // Restore defaults
    env::remove_var("DATABASE_PATH");
    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_invalid_number_uses_default() {
    env::set_var("DATABASE_MAX_CONNECTIONS", "not-a-number");

    let config = Config::from_env().unwrap();
    assert_eq!(config.database.max_connections, 5);

    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_zero_connections_rejected() {
    env::set_var("DATABASE_MAX_CONNECTIONS", "0");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("DATABASE_MAX_CONNECTIONS"));

    env::remove_var("DATABASE_MAX_CONNECTIONS");
}

#[test]
#[serial]
fn test_config_from_env_json_log_format() {
    env::set_var("LOG_FORMAT", "JSON");
    env::set_var("LOG_LEVEL", "debug");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "debug");

    env::remove_var("LOG_FORMAT");
    env::remove_var("LOG_LEVEL");
}

#[test]
#[serial]
fn test_config_unknown_log_format_is_pretty() {
    env::set_var("LOG_FORMAT", "yaml");

    let config = Config::from_env().unwrap();
    assert_eq!(config.logging.format, LogFormat::Pretty);

    env::remove_var("LOG_FORMAT");
}
