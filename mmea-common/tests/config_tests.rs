//! Integration tests for config path resolution and TOML loading
//!
//! Covers:
//! - Priority order: CLI argument > MMEA_CONFIG > OS default
//! - Missing TOML files fall back to defaults instead of failing
//! - Broken TOML files are reported as configuration errors
//! - Atomic TOML writes (temp + rename)
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MMEA_CONFIG are marked with #[serial].

use mmea_common::config::{
    load_toml_config, write_toml_config, ConfigResolver, LoggingConfig, CONFIG_ENV_VAR,
};
use mmea_common::Error;
use serde::{Deserialize, Serialize};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SampleConfig {
    logging: LoggingConfig,
    window: usize,
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(CONFIG_ENV_VAR);

    let resolver = ConfigResolver::new("test-module");
    let path = resolver.resolve(None);

    assert_eq!(path, resolver.default_path());
    assert!(path.ends_with("test-module.toml"));
}

#[test]
#[serial]
fn test_resolver_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/mmea-env-config.toml");

    let resolver = ConfigResolver::new("test-module");
    let path = resolver.resolve(None);

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(path, PathBuf::from("/tmp/mmea-env-config.toml"));
}

#[test]
#[serial]
fn test_resolver_cli_beats_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/mmea-env-config.toml");

    let resolver = ConfigResolver::new("test-module");
    let path = resolver.resolve(Some(Path::new("/tmp/mmea-cli-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(path, PathBuf::from("/tmp/mmea-cli-config.toml"));
}

#[test]
#[serial]
fn test_resolver_ignores_blank_env_var() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolver = ConfigResolver::new("test-module");
    let path = resolver.resolve(None);

    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(path, resolver.default_path());
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config: SampleConfig = load_toml_config(&path).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("partial.toml");
    std::fs::write(&path, "window = 7\n").unwrap();

    let config: SampleConfig = load_toml_config(&path).unwrap();
    assert_eq!(config.window, 7);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_broken_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "window = [not toml").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_config(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_write_then_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("written.toml");

    let config = SampleConfig {
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        window: 3,
    };
    write_toml_config(&config, &path).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded: SampleConfig = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}
