use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::tailoring::TailorError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Tailor(#[from] TailorError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details): (StatusCode, &str, String, Option<Value>) =
            match &self {
                AppError::ServiceUnavailable(msg) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    msg.clone(),
                    None,
                ),
                AppError::Tailor(TailorError::SchemaViolation(violations)) => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Invalid request: {} field(s) failed validation", violations.len()),
                    serde_json::to_value(violations).ok(),
                ),
                AppError::Tailor(e @ TailorError::UpstreamTimeout { timeout, .. }) => {
                    tracing::error!(stage = e.stage(), "{e}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "UPSTREAM_TIMEOUT",
                        format!(
                            "AI service did not respond within {}s. Please try again.",
                            timeout.as_secs_f64()
                        ),
                        None,
                    )
                }
                AppError::Tailor(e @ TailorError::UpstreamExhausted { attempts, .. }) => {
                    tracing::error!(stage = e.stage(), "{e}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "UPSTREAM_UNAVAILABLE",
                        format!("AI service failed after {attempts} attempt(s). Please try again later."),
                        None,
                    )
                }
                AppError::Tailor(e @ TailorError::MalformedResponse { raw, .. }) => {
                    tracing::error!(stage = e.stage(), raw_length = raw.len(), "{e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "MALFORMED_AI_RESPONSE",
                        "The AI service returned an unreadable response".to_string(),
                        None,
                    )
                }
                AppError::Tailor(e @ TailorError::Reconciliation(violations)) => {
                    tracing::error!(stage = e.stage(), "{e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "RECONCILIATION_ERROR",
                        "The tailored resume failed validation".to_string(),
                        serde_json::to_value(violations).ok(),
                    )
                }
                AppError::Tailor(e @ TailorError::Encode(_)) => {
                    tracing::error!(stage = e.stage(), "{e}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                        None,
                    )
                }
            };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
