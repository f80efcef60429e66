mod config;
mod errors;
mod llm_client;
mod models;
mod routes;
mod schema;
mod sessions;
mod state;
mod tailoring;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::routes::{build_router, cors_layer};
use crate::sessions::FsSessionStore;
use crate::state::AppState;
use crate::tailoring::TailorService;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the upstream client once; every request shares it
    let tailor = match &config.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(key.clone(), config.gemini_model.clone())?;
            let settings = config.tailor_settings();
            info!(
                model = %config.gemini_model,
                timeout_secs = settings.policy.timeout.as_secs(),
                max_retries = settings.policy.max_retries,
                "Gemini client initialized"
            );
            Some(TailorService::new(Arc::new(client), settings))
        }
        None => {
            warn!("GEMINI_API_KEY not set; /api/tailor will return 503");
            None
        }
    };

    let sessions = FsSessionStore::new(&config.artifacts_dir);
    info!("Session artifacts under {}", sessions.root().display());

    let state = AppState {
        tailor,
        sessions: Arc::new(sessions),
        config: config.clone(),
    };

    info!("CORS origins: {:?}", config.cors_origins);
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins));

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
