//! Newline-delimited JSON decoding for the backend event stream

use serde::Deserialize;

/// One decoded event from the backend stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelEvent {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

impl ModelEvent {
    /// The text fragment to forward, if any
    pub fn fragment(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.is_empty())
    }
}

/// Reassembles raw chunks into complete lines.
///
/// Bytes after the last newline stay buffered until a later chunk completes
/// the line, so a split line is never decoded early.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    discarded: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and decode every line it completes.
    ///
    /// Blank lines are skipped. Lines that are not valid event JSON are
    /// dropped and counted.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<ModelEvent> {
        // Buffered bytes never contain a newline, so only the new chunk is scanned.
        let scanned = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = chunk.iter().rposition(|&b| b == b'\n').map(|i| scanned + i)
        else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        let mut events = Vec::new();
        for line in complete.split(|&b| b == b'\n') {
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<ModelEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    self.discarded += 1;
                    tracing::debug!(
                        "Discarding malformed backend line ({} bytes): {}",
                        line.len(),
                        e
                    );
                }
            }
        }
        events
    }

    /// Bytes waiting for a terminating newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Number of lines dropped as malformed so far
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}
