//! Bridge configuration.
//!
//! Settings come from an optional TOML file and are then overlaid with the
//! host's environment contract:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `CLAUDE_USE_STDIN` | `"true"` enables the stdin channel read; anything else disables it |
//! | `CLAUDE_ATTACHMENTS_FILE` | legacy path to a JSON array of attachments |
//!
//! Components receive the resolved [`BridgeConfig`] (or one of its sections)
//! instead of reading process globals.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_USE_STDIN: &str = "CLAUDE_USE_STDIN";
pub const ENV_ATTACHMENTS_FILE: &str = "CLAUDE_ATTACHMENTS_FILE";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Application namespace the provider query filters on.
    #[serde(default = "default_app_type")]
    pub app_type: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            app_type: default_app_type(),
        }
    }
}

fn default_app_type() -> String {
    "claude".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Set only from `CLAUDE_USE_STDIN`.
    #[serde(skip)]
    pub enabled: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub fallback_file: Option<PathBuf>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_ms: default_timeout_ms(),
            fallback_file: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl ChannelConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl BridgeConfig {
    /// Overlay the host environment contract using `lookup` to read variables.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.channel.enabled = lookup(ENV_USE_STDIN).as_deref() == Some("true");
        if let Some(path) = lookup(ENV_ATTACHMENTS_FILE).filter(|p| !p.is_empty()) {
            self.channel.fallback_file = Some(PathBuf::from(path));
        }
        self
    }
}

/// Load configuration from `path` (if given) and overlay the process environment.
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let config = match path {
        Some(path) => parse_config_file(path)?,
        None => BridgeConfig::default(),
    };
    Ok(config.with_env(|key| std::env::var(key).ok()))
}

fn parse_config_file(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: BridgeConfig =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.store.app_type.trim().is_empty() {
        anyhow::bail!("store.app_type must not be empty");
    }

    if config.channel.timeout_ms == 0 {
        anyhow::bail!("channel.timeout_ms must be > 0");
    }

    Ok(config)
}
