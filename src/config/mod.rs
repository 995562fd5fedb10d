//! Application configuration

pub mod relay;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use relay::{BackendConfig, ConfigError, RelayConfig, StreamConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub relay: RelayConfig,
}

impl Config {
    /// Read `HOST`, `PORT`, `EXPLAINER_CONFIG` and `OLLAMA_URL`.
    ///
    /// `OLLAMA_URL` wins over `backend.url` from the file.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut relay = match env::var("EXPLAINER_CONFIG").ok().map(PathBuf::from) {
            Some(path) => {
                tracing::info!("Loading relay config from {}", path.display());
                RelayConfig::from_file(&path)?
            }
            None => RelayConfig::default(),
        };

        if let Ok(url) = env::var("OLLAMA_URL") {
            relay.backend.url = url;
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            relay,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            relay: RelayConfig::default(),
        }
    }
}
