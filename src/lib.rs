//! API Explainer
//!
//! Relays chat requests to a local Ollama server and streams the generated
//! explanation back as plain text. The `client` module holds the chat state
//! machine that consumes that stream.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod routes;

use crate::config::Config;
use crate::core::RelayEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub relay: Arc<RelayEngine>,
}
