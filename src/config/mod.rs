//! Configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chat::anthropic::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::lookup::{DATATRACKER_API_BASE, RFC_EDITOR_BASE};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream RFC service settings
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Chat session and model settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Upstream RFC service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Datatracker API base URL
    #[serde(default = "default_datatracker_base")]
    pub datatracker_base: String,

    /// RFC Editor base URL for plain-text documents
    #[serde(default = "default_rfc_editor_base")]
    pub rfc_editor_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            datatracker_base: default_datatracker_base(),
            rfc_editor_base: default_rfc_editor_base(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_datatracker_base() -> String {
    DATATRACKER_API_BASE.to_string()
}

fn default_rfc_editor_base() -> String {
    RFC_EDITOR_BASE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Chat session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model identifier used for chat sessions
    #[serde(default = "default_model")]
    pub model: String,

    /// Token budget per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Override for the Anthropic API base URL
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_base: None,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("RFC_TOOLS")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, letting environment variables override it
pub fn load_config(path: &PathBuf) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_path()))
        .add_source(env_source())
        .build()?;

    settings.try_deserialize()
}

/// Build configuration from environment variables and defaults alone
pub fn env_config() -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder().add_source(env_source()).build()?;

    settings.try_deserialize()
}

/// Locate a config file in the conventional places.
///
/// A `rfc-tools.toml` in the working directory wins over the per-user
/// `<config dir>/rfc-tools/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("rfc-tools.toml");
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("rfc-tools").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.lookup.datatracker_base.contains("datatracker.ietf.org"));
        assert!(config.lookup.rfc_editor_base.contains("rfc-editor.org"));
        assert_eq!(config.lookup.timeout_secs, 30);
        assert_eq!(config.lookup.connect_timeout_secs, 10);
        assert_eq!(config.chat.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.chat.api_base.is_none());
    }

    #[test]
    fn test_load_config_overrides_defaults() {
        let file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        std::fs::write(
            file.path(),
            "[lookup]\ntimeout_secs = 5\n\n[chat]\nmodel = \"claude-3-5-haiku-latest\"\n",
        )
        .unwrap();

        let config = load_config(&file.path().to_path_buf()).unwrap();
        assert_eq!(config.lookup.timeout_secs, 5);
        assert_eq!(config.chat.model, "claude-3-5-haiku-latest");
        // Untouched sections keep their defaults.
        assert_eq!(config.lookup.connect_timeout_secs, 10);
        assert_eq!(config.chat.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_load_config_missing_file() {
        let path = PathBuf::from("/nonexistent/rfc-tools.toml");
        assert!(load_config(&path).is_err());
    }
}
