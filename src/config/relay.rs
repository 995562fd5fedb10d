//! Relay configuration loaded from TOML files
//!
//! Every section is optional; an empty file yields the defaults:
//!
//! ```toml
//! [backend]
//! url = "http://localhost:11434"
//! model = "llama3"
//! temperature = 0.2
//!
//! [stream]
//! channel_capacity = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Inference backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Outgoing stream settings
    #[serde(default)]
    pub stream: StreamConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::Validation(
                "stream.channel_capacity must be at least 1".into(),
            ));
        }
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Validation("backend.url must not be empty".into()));
        }
        Ok(())
    }
}

/// Inference backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_url")]
    pub url: String,

    /// Model used when a request does not name one
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature used when a request does not set one
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Connect timeout; unset means wait indefinitely
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

fn default_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            temperature: default_temperature(),
            connect_timeout_secs: None,
        }
    }
}

/// Outgoing stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Fragments buffered between the backend reader and the response body
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Text written before the error message when the backend fails
    /// mid-stream. Unset means the stream just ends.
    #[serde(default)]
    pub error_sentinel: Option<String>,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            error_sentinel: None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
