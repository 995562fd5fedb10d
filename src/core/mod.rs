//! Core relay components
//!
//! Prompt construction, backend line decoding and the streaming relay itself.

pub mod ndjson;
pub mod prompt;
pub mod relay;

pub use ndjson::{LineDecoder, ModelEvent};
pub use prompt::build_prompt;
pub use relay::{ChatRequest, RelayEngine, RelayError, RelayStream};
