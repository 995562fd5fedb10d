//! Chat client state machine
//!
//! `ChatSession` owns everything the chat page shows: the transcript, the
//! input box, the JSON mode flag and the in-flight phase. A UI drives it
//! either step by step (`begin_submit`, `on_response_started`, `on_chunk`,
//! `on_error`, `finish`) or through `submit`, which runs one whole exchange
//! against a `RelayTransport`.
//!
//! Only one submission is in flight at a time; `begin_submit` refuses while
//! the session is loading.

pub mod theme;
pub mod transport;

use futures::StreamExt;

use crate::conversation::{Conversation, Role};
use crate::core::ChatRequest;

pub use theme::{Appearance, Theme};
pub use transport::{ChunkStream, ClientError, HttpRelay, RelayTransport, Utf8Accumulator};

/// Where a submission currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingFirstByte,
    StreamingAssistantReply,
    Complete,
}

/// Why a submission was refused without contacting the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Busy,
    EmptyInput,
    InvalidJson(String),
}

/// Result of `ChatSession::submit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(RejectReason),
    Completed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    transcript: Conversation,
    input: String,
    json_mode: bool,
    json_error: Option<String>,
    phase: Phase,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    /// New session in JSON mode with an empty transcript
    pub fn new() -> Self {
        Self {
            transcript: Conversation::new(),
            input: String::new(),
            json_mode: true,
            json_error: None,
            phase: Phase::Idle,
        }
    }

    pub fn transcript(&self) -> &Conversation {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn json_mode(&self) -> bool {
        self.json_mode
    }

    /// Parse error for the current input, shown inline in JSON mode
    pub fn json_error(&self) -> Option<&str> {
        self.json_error.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            Phase::AwaitingFirstByte | Phase::StreamingAssistantReply
        )
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
        self.validate();
    }

    pub fn set_json_mode(&mut self, enabled: bool) {
        self.json_mode = enabled;
        self.validate();
    }

    /// Load an uploaded file into the input box.
    ///
    /// JSON files are pretty-printed with their key order kept; anything
    /// else is taken as-is.
    pub fn load_file_contents(&mut self, text: &str) {
        let input = serde_json::from_str::<serde_json::Value>(text)
            .ok()
            .and_then(|value| serde_json::to_string_pretty(&value).ok())
            .unwrap_or_else(|| text.to_string());
        self.set_input(input);
    }

    /// Start a new chat
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Whether the send control is enabled for the current input
    pub fn can_send(&self) -> bool {
        self.check_input().is_ok()
    }

    fn check_input(&self) -> Result<(), RejectReason> {
        if self.input.trim().is_empty() {
            return Err(RejectReason::EmptyInput);
        }
        if self.json_mode {
            serde_json::from_str::<serde_json::Value>(&self.input)
                .map_err(|e| RejectReason::InvalidJson(e.to_string()))?;
        }
        Ok(())
    }

    fn validate(&mut self) {
        self.json_error = if self.json_mode {
            serde_json::from_str::<serde_json::Value>(&self.input)
                .err()
                .map(|e| e.to_string())
        } else {
            None
        };
    }

    /// Move the input into the transcript and build the relay request.
    ///
    /// Nothing changes when the request is refused.
    pub fn begin_submit(&mut self) -> Result<ChatRequest, RejectReason> {
        if self.is_loading() {
            return Err(RejectReason::Busy);
        }
        if let Err(reason) = self.check_input() {
            if let RejectReason::InvalidJson(ref message) = reason {
                self.json_error = Some(message.clone());
            }
            return Err(reason);
        }

        let content = std::mem::take(&mut self.input);
        self.transcript.add_user(&content);
        self.json_error = None;
        self.phase = Phase::AwaitingFirstByte;

        Ok(ChatRequest {
            messages: self.transcript.clone(),
            is_json: Some(self.json_mode),
            temperature: None,
            model: None,
        })
    }

    /// The relay accepted the request; add the empty assistant reply
    pub fn on_response_started(&mut self) {
        self.transcript.add_assistant("");
        self.phase = Phase::StreamingAssistantReply;
    }

    /// Append streamed text to the assistant reply
    pub fn on_chunk(&mut self, text: &str) {
        if let Some(last) = self.transcript.last_mut() {
            if last.role == Role::Assistant {
                last.content.push_str(text);
            }
        }
    }

    /// Record a failure as its own assistant message. Text already
    /// streamed stays in place.
    pub fn on_error(&mut self, message: &str) {
        self.transcript.add_assistant(&format!("Error: {}", message));
    }

    /// End the submission; the send control is usable again
    pub fn finish(&mut self) {
        self.phase = Phase::Complete;
    }

    /// Run one full exchange: send the transcript, stream the reply into
    /// it, and call `render` after every visible change.
    pub async fn submit<F>(&mut self, transport: &dyn RelayTransport, mut render: F) -> SubmitOutcome
    where
        F: FnMut(&Conversation),
    {
        let request = match self.begin_submit() {
            Ok(request) => request,
            Err(reason) => {
                tracing::debug!("Submission refused: {:?}", reason);
                return SubmitOutcome::Rejected(reason);
            }
        };
        render(&self.transcript);

        let outcome = match self.stream_reply(transport, &request, &mut render).await {
            Ok(()) => SubmitOutcome::Completed,
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Chat request failed: {}", message);
                self.on_error(&message);
                render(&self.transcript);
                SubmitOutcome::Failed(message)
            }
        };

        self.finish();
        outcome
    }

    async fn stream_reply<F>(
        &mut self,
        transport: &dyn RelayTransport,
        request: &ChatRequest,
        render: &mut F,
    ) -> Result<(), ClientError>
    where
        F: FnMut(&Conversation),
    {
        let mut chunks = transport.send(request).await?;

        self.on_response_started();
        render(&self.transcript);

        let mut decoder = Utf8Accumulator::new();
        while let Some(chunk) = chunks.next().await {
            let text = decoder.push(&chunk?);
            if !text.is_empty() {
                self.on_chunk(&text);
                render(&self.transcript);
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            self.on_chunk(&tail);
            render(&self.transcript);
        }
        Ok(())
    }
}
