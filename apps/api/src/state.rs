use std::sync::Arc;

use crate::config::Config;
use crate::sessions::SessionStore;
use crate::tailoring::TailorService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no upstream API key is configured; tailoring then reports 503.
    pub tailor: Option<TailorService>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Config,
}
