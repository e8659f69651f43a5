//! Configuration loading, validation, and management for cnbchat.
//!
//! Loads configuration from `~/.cnbchat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.cnbchat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer token for the CNB OpenAPI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Knowledge-base repository used when a question names none
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Initial state of the think/answer split
    #[serde(default)]
    pub think_mode: bool,

    /// Base URL of the CNB OpenAPI
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model id sent to the completion endpoint
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout, covering the whole completion stream
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_repository() -> String {
    "cnb/docs".into()
}
fn default_api_base_url() -> String {
    "https://api.cnb.cool".into()
}
fn default_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("token", &redact(&self.token))
            .field("repository", &self.repository)
            .field("think_mode", &self.think_mode)
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.cnbchat/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `CNB_TOKEN` / `CNBCHAT_TOKEN` (only when the file has no token)
    /// - `CNB_REPO`
    /// - `CNBCHAT_MODEL`
    /// - `CNBCHAT_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// Read `path`, apply overrides from `var`, then validate the result.
    fn load_with(path: &Path, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(var);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a specific file path.
    ///
    /// No validation happens here; environment overrides may still fix
    /// the values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.token.is_none() {
            self.token = var("CNB_TOKEN").or_else(|| var("CNBCHAT_TOKEN"));
        }

        if let Some(repo) = var("CNB_REPO") {
            self.repository = repo;
        }

        if let Some(model) = var("CNBCHAT_MODEL") {
            self.model = model;
        }

        if let Some(url) = var("CNBCHAT_API_URL") {
            self.api_base_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".cnbchat")
    }

    /// Validate the configuration.
    ///
    /// A missing token or an empty repository is not a load error: the
    /// service reports it to the user on the first question instead.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "api_base_url must be an http(s) URL, got '{}'",
                self.api_base_url
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        Ok(())
    }

    /// Check if a token is available (from config or environment).
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token: None,
            repository: default_repository(),
            think_mode: false,
            api_base_url: default_api_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
