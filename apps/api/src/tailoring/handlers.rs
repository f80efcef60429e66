//! Axum route handlers for the Tailoring API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::tailor::{TailorRequest, TailorResponse};
use crate::schema::validate_request;
use crate::state::AppState;
use crate::tailoring::TailorError;

const UNAVAILABLE_MESSAGE: &str =
    "AI tailoring is not configured. Set GEMINI_API_KEY to enable it.";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub message: String,
}

/// POST /api/tailor
///
/// Validates the request, runs the tailoring pipeline and stores the result
/// as a session artifact. A storage failure is logged; the caller still gets
/// the tailored résumé.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    let job = validate_request(request).map_err(TailorError::SchemaViolation)?;

    let service = state
        .tailor
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable(UNAVAILABLE_MESSAGE.to_string()))?;

    let resume_id = job.resume.id.clone();
    let candidate = job.resume.personal_info.name.clone();
    let target_role = job.target_role.clone();

    info!(
        resume_id = %resume_id,
        jd_length = job.job_description.len(),
        preserve_structure = job.preserve_structure,
        "tailoring requested"
    );

    let response = service.run(job).await?;

    match state
        .sessions
        .save(&response, &resume_id, &candidate, target_role.as_deref())
        .await
    {
        Ok(handle) => info!(session_id = %handle.id, path = %handle.path.display(), "session saved"),
        Err(e) => warn!(error = ?e, resume_id = %resume_id, "failed to save tailoring session"),
    }

    Ok(Json(response))
}

/// GET /api/tailor/status
pub async fn handle_status(State(state): State<AppState>) -> (StatusCode, Json<StatusResponse>) {
    match &state.tailor {
        Some(service) => (
            StatusCode::OK,
            Json(StatusResponse {
                status: "available",
                model: Some(service.model().to_string()),
                message: "AI tailoring service is ready".to_string(),
            }),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusResponse {
                status: "unavailable",
                model: None,
                message: UNAVAILABLE_MESSAGE.to_string(),
            }),
        ),
    }
}
