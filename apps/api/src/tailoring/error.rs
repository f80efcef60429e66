use std::time::Duration;

use thiserror::Error;

use crate::llm_client::LlmError;
use crate::schema::Violations;

/// Failures of the tailoring pipeline. Each variant belongs to exactly one
/// stage; nothing after a failing stage runs.
///
/// Transient upstream errors never appear here: the orchestrator retries
/// them and only reports `UpstreamExhausted` once the budget is spent.
#[derive(Debug, Error)]
pub enum TailorError {
    #[error("schema violation: {0}")]
    SchemaViolation(Violations),

    #[error("upstream call exceeded {}s deadline on attempt {attempt}", .timeout.as_secs_f64())]
    UpstreamTimeout { timeout: Duration, attempt: u32 },

    #[error("upstream call failed after {attempts} attempt(s): {source}")]
    UpstreamExhausted {
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("malformed upstream response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("reconciliation produced an invalid resume: {0}")]
    Reconciliation(Violations),

    #[error("failed to encode upstream prompt: {0}")]
    Encode(#[from] serde_json::Error),
}

impl TailorError {
    /// Pipeline stage that produced the failure, for logs and diagnostics.
    pub fn stage(&self) -> &'static str {
        match self {
            TailorError::SchemaViolation(_) => "schema",
            TailorError::Encode(_) => "projection",
            TailorError::UpstreamTimeout { .. } | TailorError::UpstreamExhausted { .. } => {
                "orchestrator"
            }
            TailorError::MalformedResponse { .. } => "parser",
            TailorError::Reconciliation(_) => "merger",
        }
    }
}
