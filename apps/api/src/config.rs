use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::tailoring::{CallPolicy, TailorSettings};

const DEFAULT_CORS_ORIGINS: &str = "chrome-extension://*,http://localhost:5173,http://localhost:3000";

/// Application configuration loaded from environment variables.
/// Fails at startup if a set variable cannot be parsed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Tailoring is disabled when unset.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_max_tokens: u32,
    pub gemini_timeout_secs: u64,
    pub gemini_retry_attempts: u32,
    pub gemini_retry_delay_secs: f64,
    pub cors_origins: Vec<String>,
    pub artifacts_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let retry_delay: f64 = parse_or(&get, "GEMINI_RETRY_DELAY", 1.0)?;
        if !retry_delay.is_finite() || retry_delay < 0.0 {
            anyhow::bail!("GEMINI_RETRY_DELAY must be a non-negative number of seconds");
        }

        let timeout_secs: u64 = parse_or(&get, "GEMINI_TIMEOUT", 30)?;
        if timeout_secs == 0 {
            anyhow::bail!("GEMINI_TIMEOUT must be at least 1 second");
        }

        Ok(Config {
            port: parse_or(&get, "PORT", 8000)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_temperature: parse_or(&get, "GEMINI_TEMPERATURE", 0.7)?,
            gemini_max_tokens: parse_or(&get, "GEMINI_MAX_TOKENS", 16_384)?,
            gemini_timeout_secs: timeout_secs,
            gemini_retry_attempts: parse_or(&get, "GEMINI_RETRY_ATTEMPTS", 3)?,
            gemini_retry_delay_secs: retry_delay,
            cors_origins: get("CORS_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            artifacts_dir: get("ARTIFACTS_DIR").unwrap_or_else(|| "artifacts".to_string()),
        })
    }

    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(self.gemini_timeout_secs),
            max_retries: self.gemini_retry_attempts,
            base_delay: Duration::from_secs_f64(self.gemini_retry_delay_secs),
        }
    }

    pub fn tailor_settings(&self) -> TailorSettings {
        TailorSettings {
            policy: self.call_policy(),
            temperature: self.gemini_temperature,
            max_output_tokens: self.gemini_max_tokens,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
