//! API Explainer server
//!
//! Serves the chat page and the streaming `/api/chat` relay.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_explainer::config::Config;
use api_explainer::core::RelayEngine;
use api_explainer::providers::{Backend, OllamaProvider};
use api_explainer::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_explainer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let backend: Arc<dyn Backend> = Arc::new(OllamaProvider::from_config(&config.relay.backend)?);
    tracing::info!(
        "Using {} at {} (default model {})",
        backend.name(),
        config.relay.backend.url,
        config.relay.backend.model
    );
    if config.relay.stream.error_sentinel.is_some() {
        tracing::info!("Mid-stream backend errors will be reported in-band");
    }

    let relay = Arc::new(RelayEngine::new(backend, &config.relay));
    let state = AppState { config, relay };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("API Explainer running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
