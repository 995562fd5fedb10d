//! HTTP routes

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::core::{ChatRequest, RelayError};
use crate::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Relay a chat request as a plain-text stream of model fragments.
///
/// The body is parsed by hand so that every malformed request maps to a
/// 400 with a JSON error, whatever the content type.
async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let request = ChatRequest::from_slice(&body).map_err(|e| {
        tracing::warn!("Rejected chat request: {}", e);
        e
    })?;

    let stream = state.relay.relay(request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream.into_stream()),
    )
        .into_response())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/chat", post(chat))
}
