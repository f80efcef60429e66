use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::resume::Resume;

/// Request body for `POST /api/tailor`.
///
/// `resume` stays untyped here: legacy exports arrive in several shapes and
/// are normalized by `schema::parse_resume`, which reports every bad field
/// at once instead of failing on the first one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest {
    #[serde(default)]
    pub resume: Value,
    #[serde(default)]
    pub job_description: String,
    #[serde(default = "default_preserve_structure")]
    pub preserve_structure: bool,
    #[serde(default)]
    pub target_role: Option<String>,
}

fn default_preserve_structure() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorResponse {
    pub tailored_resume: Resume,
    pub ats_score: u8,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    pub changes: Vec<String>,
}
