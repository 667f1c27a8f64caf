//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests:
//! - Missing TOML files do not cause termination
//! - Malformed TOML falls back to defaults
//! - Priority order for config file resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ROLLCALL_CONFIG are marked with #[serial].

use rollcall_common::config::{
    load_or_default, load_toml_config, CompiledDefaults, ConfigFileResolver, ConfigSource,
    TomlConfig, CONFIG_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_temp_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_explicit_path_takes_precedence() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rollcall-from-env.toml");

    let resolver = ConfigFileResolver::new("test-module");
    let explicit = PathBuf::from("/tmp/rollcall-explicit.toml");
    let resolved = resolver.resolve(Some(&explicit));

    assert_eq!(resolved, Some(explicit));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_when_no_explicit_path() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/rollcall-from-env.toml");

    let resolver = ConfigFileResolver::new("test-module");
    let resolved = resolver.resolve(None);

    assert_eq!(resolved, Some(PathBuf::from("/tmp/rollcall-from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_config_resolves_to_none() {
    env::remove_var(CONFIG_ENV_VAR);

    // A module name that definitely won't have a config file
    let resolver = ConfigFileResolver::new("nonexistent-test-module-12345");
    assert_eq!(resolver.resolve(None), None);
}

#[test]
fn test_load_valid_config() {
    let file = write_temp_config(
        r#"
        host = "0.0.0.0"
        port = 8080
        notification_ttl_ms = 1500

        [logging]
        level = "warn"
        "#,
    );

    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.notification_ttl_ms, Some(1500));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let (config, source) = load_or_default(Some(&PathBuf::from("/nonexistent/rollcall/missing.toml")));
    assert_eq!(config, TomlConfig::default());
    assert!(matches!(source, ConfigSource::Unusable { .. }));
}

#[test]
fn test_malformed_file_falls_back_to_defaults() {
    let file = write_temp_config("port = \"not a number\"\n[[[broken");
    assert!(load_toml_config(file.path()).is_err());

    let (config, source) = load_or_default(Some(file.path()));
    assert_eq!(config, TomlConfig::default());
    match source {
        ConfigSource::Unusable { path, error } => {
            assert_eq!(path, file.path());
            assert!(error.to_string().contains("Parse TOML failed"));
        }
        other => panic!("expected an unusable file, got {:?}", other),
    }
}

#[test]
fn test_no_path_gives_defaults() {
    let (config, source) = load_or_default(None);
    assert!(matches!(source, ConfigSource::Defaults));
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
    assert_eq!(CompiledDefaults::new().log_level, config.logging.level);
}
