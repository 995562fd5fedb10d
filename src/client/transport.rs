//! Transport between the chat client and the relay endpoint

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;

use crate::core::ChatRequest;

/// Errors seen by the chat client. The display text is what ends up in
/// the transcript.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Stream(String),
}

impl ClientError {
    /// Build a status error from a non-success response body.
    ///
    /// An empty body falls back to `HTTP <status>`.
    pub fn from_status(status: u16, body: String) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };
        ClientError::Status { status, message }
    }
}

/// Response body chunks in arrival order
pub type ChunkStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Sends a chat request and yields the streamed reply
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError>;
}

/// Relay transport over HTTP
pub struct HttpRelay {
    client: Client,
    endpoint: String,
}

impl HttpRelay {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Transport for a relay served at `base_url`
    pub fn for_server(base_url: &str) -> Self {
        Self::new(format!("{}/api/chat", base_url.trim_end_matches('/')))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn send(&self, request: &ChatRequest) -> Result<ChunkStream, ClientError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }
}

/// Incremental UTF-8 decoding of streamed chunks.
///
/// A multi-byte character split across two chunks is held back until it
/// is complete.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the buffered input as possible.
    ///
    /// Invalid sequences become U+FFFD; an incomplete sequence at the end
    /// stays pending.
    pub fn push(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_up_to = consumed + e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_up_to]));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_up_to + len;
                        }
                        None => {
                            consumed = valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        text
    }

    /// Flush whatever is left, replacing invalid bytes
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_text() {
        assert_eq!(
            ClientError::from_status(500, r#"{"error":"Ollama error: 404 Not Found"}"#.into())
                .to_string(),
            r#"{"error":"Ollama error: 404 Not Found"}"#
        );
        assert_eq!(ClientError::from_status(502, String::new()).to_string(), "HTTP 502");
    }

    #[test]
    fn test_endpoint() {
        let relay = HttpRelay::for_server("http://127.0.0.1:3000/");
        assert_eq!(relay.endpoint(), "http://127.0.0.1:3000/api/chat");
    }

    #[test]
    fn test_split_multibyte_character() {
        let bytes = "h\u{e9}llo \u{1f600}".as_bytes();
        let mut decoder = Utf8Accumulator::new();

        let mut text = String::new();
        for chunk in bytes.chunks(1) {
            text.push_str(&decoder.push(chunk));
        }
        text.push_str(&decoder.finish());

        assert_eq!(text, "h\u{e9}llo \u{1f600}");
    }

    #[test]
    fn test_partial_character_held_back() {
        let mut decoder = Utf8Accumulator::new();
        assert_eq!(decoder.push(&[b'a', 0xC3]), "a");
        assert_eq!(decoder.push(&[0xA9]), "\u{e9}");
    }

    #[test]
    fn test_invalid_bytes_replaced() {
        let mut decoder = Utf8Accumulator::new();
        assert_eq!(decoder.push(&[b'a', 0xFF, b'b']), "a\u{fffd}b");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_invalid_byte_before_partial_character() {
        let mut decoder = Utf8Accumulator::new();
        assert_eq!(decoder.push(&[0xFF, b'x', 0xC3]), "\u{fffd}x");
        assert_eq!(decoder.push(&[0xA9]), "\u{e9}");
        assert_eq!(decoder.finish(), "");
    }
}
