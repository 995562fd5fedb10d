//! Ollama provider implementation
//!
//! Uses the `/api/generate` endpoint with `stream: true`, which answers with
//! one JSON object per line.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

use crate::config::BackendConfig;

use super::{Backend, ByteStream, GenerateRequest, ProviderError};

pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        // Only the connect phase is bounded; a long generation is not a failure.
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl Backend for OllamaProvider {
    fn name(&self) -> &'static str {
        "Ollama"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<ByteStream, ProviderError> {
        let body = OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status {
                backend: self.name(),
                status: response.status(),
            });
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ProviderError::from))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = OllamaRequest {
            model: "llama3",
            prompt: "hi",
            stream: true,
            options: OllamaOptions { temperature: 0.2 },
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "llama3",
                "prompt": "hi",
                "stream": true,
                "options": { "temperature": 0.2 }
            })
        );
    }

    #[test]
    fn test_generate_url_from_config() {
        let config = BackendConfig {
            url: "http://gpu-box:11434/".into(),
            ..BackendConfig::default()
        };
        let provider = OllamaProvider::from_config(&config).unwrap();
        assert_eq!(provider.generate_url(), "http://gpu-box:11434/api/generate");
    }

    #[test]
    fn test_status_error_message() {
        let err = ProviderError::Status {
            backend: "Ollama",
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert_eq!(err.to_string(), "Ollama error: 404 Not Found");
    }
}
