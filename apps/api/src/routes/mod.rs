pub mod health;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;
use crate::tailoring::handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/ping", get(health::ping_handler))
        // Tailoring API
        .route("/api/tailor", post(handlers::handle_tailor))
        .route("/api/tailor/status", get(handlers::handle_status))
        .with_state(state)
}

/// CORS for the configured origins. An entry ending in `*` matches any
/// origin with that prefix (e.g. `chrome-extension://*`).
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|origin| origin_allowed(&origins, origin))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => origin.starts_with(prefix),
        None => pattern == origin,
    })
}
