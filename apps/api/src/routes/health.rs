use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and upstream configuration.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let gemini = match &state.tailor {
        Some(service) => json!({ "status": "configured", "model": service.model() }),
        None => json!({
            "status": "not_configured",
            "model": state.config.gemini_model,
            "error": "GEMINI_API_KEY not set"
        }),
    };

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "services": {
            "api": { "status": "healthy" },
            "gemini_ai": gemini
        }
    }))
}

/// GET /ping
pub async fn ping_handler() -> Json<Value> {
    Json(json!({
        "ping": "pong",
        "timestamp": Utc::now().to_rfc3339()
    }))
}
