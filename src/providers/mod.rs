//! Inference backend integration

mod ollama;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use thiserror::Error;

pub use ollama::OllamaProvider;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{backend} error: {status}")]
    Status {
        backend: &'static str,
        status: StatusCode,
    },

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Raw body chunks of a streaming generation, in arrival order
pub type ByteStream = BoxStream<'static, Result<Bytes, ProviderError>>;

/// A single streaming completion request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f64,
}

/// A model server that streams newline-delimited JSON events.
///
/// `generate` resolves once the server has accepted the request; an `Err`
/// at that point means nothing has been streamed yet.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerateRequest) -> Result<ByteStream, ProviderError>;
}
