// Tailoring Engine
// Pipeline: validate → project → call upstream → parse/repair → merge → score.
// All upstream calls go through llm_client::TextGenerator via the orchestrator.

pub mod error;
pub mod handlers;
pub mod merger;
pub mod orchestrator;
pub mod pipeline;
pub mod projector;
pub mod prompts;
pub mod repair;
pub mod scoring;

pub use error::TailorError;
pub use orchestrator::CallPolicy;
pub use pipeline::{TailorService, TailorSettings};
