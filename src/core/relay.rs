//! Stream relay between the chat endpoint and the inference backend
//!
//! The relay:
//! 1. Validates the incoming request
//! 2. Builds the prompt from the latest user message
//! 3. Opens a streaming generation on the backend
//! 4. Hands back a channel-backed stream right away
//! 5. Decodes backend lines in a spawned task and forwards each fragment
//!
//! The spawned task owns the only sender. Any return from it, including a
//! panic unwinding through it, drops the sender and ends the response body.

use std::convert::Infallible;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{BackendConfig, RelayConfig, StreamConfig};
use crate::conversation::Conversation;
use crate::providers::{Backend, ByteStream, GenerateRequest, ProviderError};

use super::ndjson::LineDecoder;
use super::prompt::build_prompt;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Conversation,

    /// Selects the JSON explanation template
    #[serde(rename = "isJson", default, skip_serializing_if = "Option::is_none")]
    pub is_json: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatRequest {
    /// Decode a raw request body.
    ///
    /// Anything that is not an object carrying a `messages` array is a
    /// client error.
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid JSON body: {}", e)))?;

        if !value.get("messages").is_some_and(Value::is_array) {
            return Err(RelayError::InvalidRequest(
                "messages array is required".to_string(),
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| RelayError::InvalidRequest(format!("Invalid request: {}", e)))
    }

    pub fn json_mode(&self) -> bool {
        self.is_json.unwrap_or(false)
    }
}

/// Errors reported before any output has been streamed
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Backend(#[from] ProviderError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Receiving half of a relayed generation
pub struct RelayStream {
    rx: mpsc::Receiver<Bytes>,
}

impl RelayStream {
    /// Adapt into a body stream. Ends when the producer drops its sender.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let mut rx = self.rx;
        async_stream::stream! {
            while let Some(chunk) = rx.recv().await {
                yield Ok::<_, Infallible>(chunk);
            }
        }
    }
}

/// Bridges chat requests to the backend's streaming protocol
pub struct RelayEngine {
    backend: Arc<dyn Backend>,
    defaults: BackendConfig,
    stream: StreamConfig,
}

impl RelayEngine {
    pub fn new(backend: Arc<dyn Backend>, config: &RelayConfig) -> Self {
        Self {
            backend,
            defaults: config.backend.clone(),
            stream: config.stream.clone(),
        }
    }

    /// Build the backend request for a chat request
    pub fn generate_request(&self, request: &ChatRequest) -> GenerateRequest {
        GenerateRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.defaults.model.clone()),
            prompt: build_prompt(&request.messages, request.json_mode()),
            temperature: request.temperature.unwrap_or(self.defaults.temperature),
        }
    }

    /// Start relaying a request.
    ///
    /// Returns once the backend has accepted the request. Errors here are
    /// the only ones the caller sees as a status code.
    pub async fn relay(&self, request: ChatRequest) -> Result<RelayStream, RelayError> {
        let request_id = Uuid::new_v4();
        let generate = self.generate_request(&request);

        tracing::info!(
            %request_id,
            model = %generate.model,
            json_mode = request.json_mode(),
            messages = request.messages.len(),
            "Relaying chat request to {}",
            self.backend.name()
        );

        let upstream = self.backend.generate(&generate).await.map_err(|e| {
            tracing::error!(%request_id, "Backend request failed: {}", e);
            e
        })?;

        let (tx, rx) = mpsc::channel(self.stream.channel_capacity);
        let sentinel = self.stream.error_sentinel.clone();

        tokio::spawn(
            forward(upstream, tx, sentinel)
                .instrument(tracing::debug_span!("relay", %request_id)),
        );

        Ok(RelayStream { rx })
    }
}

/// Why a forwarding task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    Completed,
    BackendFailed,
    CallerGone,
}

/// Decode backend lines and forward non-empty fragments until the backend
/// ends, fails, or the caller disconnects.
pub async fn forward(
    mut upstream: ByteStream,
    tx: mpsc::Sender<Bytes>,
    error_sentinel: Option<String>,
) -> ForwardOutcome {
    let mut decoder = LineDecoder::new();
    let mut fragments = 0usize;

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!("Caller disconnected after {} fragment(s)", fragments);
                return ForwardOutcome::CallerGone;
            }
            chunk = upstream.next() => chunk,
        };

        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                tracing::warn!("Backend stream failed after {} fragment(s): {}", fragments, e);
                if let Some(sentinel) = error_sentinel {
                    let _ = tx.send(Bytes::from(format!("{}{}", sentinel, e))).await;
                }
                return ForwardOutcome::BackendFailed;
            }
            None => break,
        };

        for event in decoder.push(&bytes) {
            if let Some(text) = event.fragment() {
                if tx.send(Bytes::copy_from_slice(text.as_bytes())).await.is_err() {
                    tracing::debug!("Caller disconnected after {} fragment(s)", fragments);
                    return ForwardOutcome::CallerGone;
                }
                fragments += 1;
            }
            if event.done {
                // Skip the rest of this batch; the backend closes on its own.
                break;
            }
        }
    }

    if decoder.pending() > 0 {
        tracing::debug!(
            "Dropping {} byte(s) of unterminated backend output",
            decoder.pending()
        );
    }
    tracing::debug!(
        "Backend stream finished: {} fragment(s), {} malformed line(s)",
        fragments,
        decoder.discarded()
    );
    ForwardOutcome::Completed
}
