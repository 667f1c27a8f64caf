//! Configuration resolution for rollcall-ai
//!
//! Bootstrap settings come from the CLI (with environment fallbacks), then
//! the TOML file, then compiled defaults. The Gemini API key resolves
//! environment → TOML.

use rollcall_common::config::{CompiledDefaults, TomlConfig};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV_VAR: &str = "ROLLCALL_GEMINI_API_KEY";

/// Log levels accepted as a bare `logging.level`
const BARE_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Fully resolved service settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub log_filter: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub notification_ttl: Duration,
    pub progress_tick: Duration,
    pub event_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::resolve(None, None, &TomlConfig::default(), None)
    }
}

impl ServiceConfig {
    /// Merge CLI values, TOML and compiled defaults
    ///
    /// `api_key` is the already-resolved key (see [`resolve_gemini_api_key`]).
    pub fn resolve(
        cli_host: Option<String>,
        cli_port: Option<u16>,
        toml: &TomlConfig,
        api_key: Option<String>,
    ) -> Self {
        let defaults = CompiledDefaults::new();

        Self {
            host: cli_host
                .or_else(|| toml.host.clone())
                .unwrap_or(defaults.host),
            port: cli_port.or(toml.port).unwrap_or(defaults.port),
            log_filter: log_filter(&toml.logging.level),
            gemini_api_key: api_key,
            gemini_model: toml
                .gemini_model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.gemini_model),
            notification_ttl: Duration::from_millis(
                toml.notification_ttl_ms.unwrap_or(defaults.notification_ttl_ms),
            ),
            progress_tick: Duration::from_millis(
                toml.progress_tick_ms
                    .filter(|ms| *ms > 0)
                    .unwrap_or(defaults.progress_tick_ms),
            ),
            event_capacity: toml
                .event_capacity
                .filter(|c| *c > 0)
                .unwrap_or(defaults.event_capacity),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `EnvFilter` directive for a configured level
///
/// A bare level applies to this crate and the HTTP trace layer; anything else
/// is taken as a full directive.
pub fn log_filter(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return "rollcall_ai=info,tower_http=info".to_string();
    }
    let lower = level.to_ascii_lowercase();
    if BARE_LEVELS.contains(&lower.as_str()) {
        format!("rollcall_ai={lower},tower_http={lower}")
    } else {
        level.to_string()
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve the Gemini API key
///
/// **Priority:** environment → TOML. Returns `None` when neither source has
/// a usable key; the service then starts with extraction disabled.
pub fn resolve_gemini_api_key(env_key: Option<String>, toml: &TomlConfig) -> Option<String> {
    let env_key = env_key.filter(|k| is_valid_key(k));
    let toml_key = toml.gemini_api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("Gemini API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("Gemini API key loaded from environment variable");
        return Some(key.trim().to_string());
    }
    if let Some(key) = toml_key {
        info!("Gemini API key loaded from TOML config");
        return Some(key.trim().to_string());
    }

    warn!(
        "Gemini API key not configured; every extraction will fail. Set {} or gemini_api_key in the TOML config",
        API_KEY_ENV_VAR
    );
    None
}
