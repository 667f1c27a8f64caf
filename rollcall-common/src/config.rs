//! Bootstrap configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Explicit path (command-line argument)
//! 2. Environment variable `ROLLCALL_CONFIG`
//! 3. User config file (`~/.config/rollcall/<module>.toml` on Linux)
//! 4. System config file (`/etc/rollcall/<module>.toml`, Linux only)
//!
//! A missing or malformed file never aborts startup: the loader reports it and
//! falls back to [`CompiledDefaults`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ROLLCALL_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; unset values resolve to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gemini API key for the extraction collaborator
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[serde(default)]
    pub gemini_model: Option<String>,

    /// How long a notification stays visible
    #[serde(default)]
    pub notification_ttl_ms: Option<u64>,

    /// Simulated progress tick interval
    #[serde(default)]
    pub progress_tick_ms: Option<u64>,

    /// Event bus buffer size
    #[serde(default)]
    pub event_capacity: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in defaults used when neither CLI, environment nor TOML set a value
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub gemini_model: String,
    pub notification_ttl_ms: u64,
    pub progress_tick_ms: u64,
    pub event_capacity: usize,
}

impl CompiledDefaults {
    pub fn new() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
            log_level: default_log_level(),
            gemini_model: "gemini-2.5-flash".to_string(),
            notification_ttl_ms: 3000,
            progress_tick_ms: 500,
            event_capacity: 100,
        }
    }
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self::new()
    }
}

/// Locates the TOML file for one module
pub struct ConfigFileResolver {
    module_name: String,
}

impl ConfigFileResolver {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }

    /// Resolve the config file path, if any candidate exists
    ///
    /// An explicit path is returned even when it does not exist so that the
    /// loader can warn about it.
    pub fn resolve(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        let file_name = format!("{}.toml", self.module_name);

        if let Some(user_config) = dirs::config_dir().map(|d| d.join("rollcall").join(&file_name)) {
            if user_config.exists() {
                return Some(user_config);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/rollcall").join(&file_name);
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Where the effective [`TomlConfig`] came from
///
/// Config is read before logging starts, so the outcome is carried to the
/// caller and reported with [`ConfigSource::log`].
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Unusable { path: PathBuf, error: Error },
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
            ConfigSource::Unusable { path, error } => {
                warn!(path = %path.display(), error = %error, "Config file unusable, using compiled defaults")
            }
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}

/// Load config with graceful degradation
///
/// Missing file, unreadable file or parse failure all produce an all-default
/// [`TomlConfig`] and a [`ConfigSource::Unusable`].
pub fn load_or_default(path: Option<&Path>) -> (TomlConfig, ConfigSource) {
    let Some(path) = path else {
        return (TomlConfig::default(), ConfigSource::Defaults);
    };

    match load_toml_config(path) {
        Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
        Err(error) => (
            TomlConfig::default(),
            ConfigSource::Unusable {
                path: path.to_path_buf(),
                error,
            },
        ),
    }
}
