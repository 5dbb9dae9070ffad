//! Client configuration
//!
//! Backend origin, session file, chat reconnection and logging. Values come
//! from a TOML file, with `ROOMMATCH_*` environment variables on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chat::ReconnectPolicy;

/// Everything the client reads at startup
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket origin; derived from `base_url` when unset
    #[serde(default)]
    pub ws_url: Option<String>,

    /// No timeout when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    /// Config pointing at a specific backend origin
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// JSON file holding the persisted session
    #[serde(default)]
    pub storage_file: Option<String>,
}

impl SessionConfig {
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage_file {
            Some(file) => PathBuf::from(file),
            None => dirs::data_local_dir()
                .map(|p| p.join("roommatch"))
                .unwrap_or_else(|| PathBuf::from("./.roommatch"))
                .join("session.json"),
        }
    }
}

/// Chat transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub reconnect_attempts: u32,

    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,
}

fn default_reconnect_base_delay() -> u64 {
    1000
}

fn default_reconnect_max_delay() -> u64 {
    30_000
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: 0,
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
        }
    }
}

impl ChatConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect_attempts,
            base_delay_ms: self.reconnect_base_delay_ms,
            max_delay_ms: self.reconnect_max_delay_ms,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Defaults plus `ROOMMATCH_*` variables, no file
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Read a file, then let the environment win
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// First config file found in the usual places, else the environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("roommatch").join("config.toml")),
            Some(PathBuf::from("./roommatch.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("ROOMMATCH_API_URL") {
            self.api.base_url = url;
        }

        if let Some(file) = var("ROOMMATCH_SESSION_FILE") {
            self.session.storage_file = Some(file);
        }

        if let Some(attempts) = var("ROOMMATCH_CHAT_RECONNECT_ATTEMPTS") {
            match attempts.parse() {
                Ok(n) => self.chat.reconnect_attempts = n,
                Err(_) => tracing::warn!(value = %attempts, "Ignoring invalid ROOMMATCH_CHAT_RECONNECT_ATTEMPTS"),
            }
        }

        if let Some(level) = var("ROOMMATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("ROOMMATCH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Commented config file with every default spelled out
pub fn generate_default_config() -> String {
    r#"# RoomMatch Client Configuration
#
# Environment variables override these settings:
# - ROOMMATCH_API_URL
# - ROOMMATCH_SESSION_FILE
# - ROOMMATCH_CHAT_RECONNECT_ATTEMPTS
# - ROOMMATCH_LOG_LEVEL
# - ROOMMATCH_LOG_FORMAT

[api]
# Backend origin
base_url = "http://127.0.0.1:8000"

# WebSocket origin (defaults to base_url with ws:// or wss://)
# ws_url = "ws://127.0.0.1:8000"

# Request timeout in seconds (no timeout when unset)
# request_timeout_secs = 30

[session]
# Where the access token and user id are kept
# storage_file = "~/.local/share/roommatch/session.json"

[chat]
# Reconnect attempts after the chat socket drops (0 disables reconnection)
reconnect_attempts = 0

# Backoff: base * 2^attempt, capped at max (ms)
reconnect_base_delay_ms = 1000
reconnect_max_delay_ms = 30000

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
