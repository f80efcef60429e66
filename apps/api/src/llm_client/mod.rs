/// LLM Client — the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All text generation goes through the `TextGenerator` trait so the
/// orchestrator can be driven by a scripted double in tests.
///
/// This client makes exactly one HTTP request per `generate` call. Deadlines
/// and retries belong to `tailoring::orchestrator`, not here.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

#[cfg(test)]
pub mod mock;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("prompt blocked by upstream: {0}")]
    Blocked(String),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("upstream task failed: {0}")]
    Task(String),
}

impl LlmError {
    /// HTTP status of the failure, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Api { status, .. } => Some(*status),
            LlmError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// One outbound generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// The upstream text-generation service. Implementations are stateless per
/// call and shared across requests behind an `Arc`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client. Built once at startup; cloning shares
/// the underlying connection pool.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: &request.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GeminiResponse = response.json().await?;

        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(LlmError::Blocked(reason));
        }

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini call succeeded"
            );
        }

        if let Some(reason) = parsed.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            if reason == "MAX_TOKENS" {
                warn!("Gemini stopped at the output token limit; response is likely truncated");
            }
        }

        parsed.text().ok_or(LlmError::EmptyContent)
    }
}
