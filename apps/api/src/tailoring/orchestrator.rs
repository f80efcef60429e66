//! Call Orchestrator — drives one upstream call under a deadline and a
//! bounded exponential-backoff retry policy.
//!
//! - Each attempt runs in its own tokio task. The orchestrator waits on it
//!   with `tokio::time::timeout`; on expiry the task is aborted, not orphaned.
//! - A deadline miss fails immediately with `UpstreamTimeout` and is never
//!   retried.
//! - Any other error is classified (diagnostics only) and retried up to
//!   `max_retries` times, sleeping `base_delay × 2^n` before retry `n`.
//! - Dropping the returned future aborts the in-flight attempt as well.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::llm_client::{GenerationRequest, LlmError, TextGenerator};
use crate::tailoring::error::TailorError;
use crate::tailoring::repair::strip_code_fences;

/// Deadline and retry budget for one upstream call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl CallPolicy {
    /// Delay before retry number `retry` (0-based): `base_delay × 2^retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Heuristic class of a failed attempt. Never changes retry behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Generic,
}

const RATE_LIMIT_MARKERS: &[&str] = &[
    "429",
    "rate limit",
    "quota",
    "resource_exhausted",
    "resource exhausted",
    "overloaded",
    "too many requests",
];

pub fn classify(err: &LlmError) -> FailureClass {
    if matches!(err.status(), Some(429) | Some(503)) {
        return FailureClass::RateLimited;
    }
    let message = err.to_string().to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m)) {
        FailureClass::RateLimited
    } else {
        FailureClass::Generic
    }
}

/// Aborts the wrapped task when dropped, including when the orchestrator's
/// own future is dropped mid-await.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum Attempt {
    Done(Result<String, LlmError>),
    TimedOut,
}

/// Runs one call in an isolated task bounded by `deadline`.
async fn run_isolated(
    generator: Arc<dyn TextGenerator>,
    request: GenerationRequest,
    deadline: Duration,
) -> Attempt {
    let handle = tokio::spawn(async move { generator.generate(&request).await });
    let _guard = AbortOnDrop(handle.abort_handle());

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(result)) => Attempt::Done(result),
        Ok(Err(join_error)) => Attempt::Done(Err(LlmError::Task(join_error.to_string()))),
        Err(_) => Attempt::TimedOut,
    }
}

/// Calls the upstream service under `policy` and returns its raw text.
pub async fn call_upstream(
    generator: &Arc<dyn TextGenerator>,
    request: &GenerationRequest,
    policy: &CallPolicy,
) -> Result<String, TailorError> {
    let total_attempts = policy.max_retries.saturating_add(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let started = Instant::now();

        let outcome = run_isolated(Arc::clone(generator), request.clone(), policy.timeout).await;
        let duration_ms = started.elapsed().as_millis();

        match outcome {
            Attempt::Done(Ok(text)) => {
                info!(
                    model = generator.model(),
                    attempt,
                    prompt_length = request.user_prompt.len(),
                    response_length = text.len(),
                    duration_ms,
                    "upstream call succeeded"
                );
                if looks_truncated(&text) {
                    warn!(
                        response_length = text.len(),
                        "upstream response does not end with a closing brace or bracket; it may be truncated"
                    );
                }
                return Ok(text);
            }
            Attempt::TimedOut => {
                error!(
                    model = generator.model(),
                    attempt,
                    timeout_secs = policy.timeout.as_secs_f64(),
                    "upstream call timed out; not retrying"
                );
                return Err(TailorError::UpstreamTimeout {
                    timeout: policy.timeout,
                    attempt,
                });
            }
            Attempt::Done(Err(err)) => {
                let class = classify(&err);
                if attempt >= total_attempts {
                    error!(
                        model = generator.model(),
                        attempts = attempt,
                        ?class,
                        error = %err,
                        "upstream call failed; retry budget exhausted"
                    );
                    return Err(TailorError::UpstreamExhausted {
                        attempts: attempt,
                        source: err,
                    });
                }

                let delay = policy.backoff(attempt - 1);
                warn!(
                    model = generator.model(),
                    attempt,
                    max_attempts = total_attempts,
                    ?class,
                    error = %err,
                    duration_ms,
                    "upstream call failed, retrying after {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Cheap truncation check; the parser does the authoritative one.
fn looks_truncated(text: &str) -> bool {
    !matches!(strip_code_fences(text).chars().last(), Some('}') | Some(']'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock::{ScriptedGenerator, Step};

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_instruction: "system".into(),
            user_prompt: "prompt".into(),
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    fn policy(timeout_secs: u64, max_retries: u32, base_delay_secs: u64) -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            base_delay: Duration::from_secs(base_delay_secs),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(30, 3, 1);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_classify_rate_limits() {
        let rate_limited = LlmError::Api {
            status: 429,
            message: "slow down".into(),
        };
        let quota = LlmError::Api {
            status: 400,
            message: "RESOURCE_EXHAUSTED: quota exceeded".into(),
        };
        let generic = LlmError::Api {
            status: 500,
            message: "internal".into(),
        };
        assert_eq!(classify(&rate_limited), FailureClass::RateLimited);
        assert_eq!(classify(&quota), FailureClass::RateLimited);
        assert_eq!(classify(&generic), FailureClass::Generic);
        assert_eq!(classify(&LlmError::EmptyContent), FailureClass::Generic);
    }

    #[test]
    fn test_truncation_check() {
        assert!(!looks_truncated(r#"{"a": 1}"#));
        assert!(!looks_truncated("```json\n[1, 2]\n```"));
        assert!(looks_truncated(r#"{"a": [1, 2"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![Step::reply("{}")]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();

        let text = call_upstream(&generator, &request(), &policy(30, 3, 1))
            .await
            .unwrap();

        assert_eq!(text, "{}");
        assert_eq!(scripted.calls(), 1);
        assert_eq!(scripted.requests()[0].user_prompt, "prompt");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_retried() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![Step::Slow(
            Duration::from_secs(6),
            "{}".into(),
        )]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();
        let started = Instant::now();

        let err = call_upstream(&generator, &request(), &policy(5, 3, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TailorError::UpstreamTimeout { attempt: 1, .. }
        ));
        assert_eq!(scripted.calls(), 1);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_budget_with_backoff() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![Step::fail(503)]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();

        let err = call_upstream(&generator, &request(), &policy(30, 3, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TailorError::UpstreamExhausted { attempts: 4, .. }
        ));
        assert_eq!(scripted.calls(), 4);

        let times = scripted.call_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![
            Step::fail(429),
            Step::fail(500),
            Step::reply(r#"{"summary": "ok"}"#),
        ]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();

        let text = call_upstream(&generator, &request(), &policy(30, 3, 1))
            .await
            .unwrap();

        assert_eq!(text, r#"{"summary": "ok"}"#);
        assert_eq!(scripted.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_means_single_attempt() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![Step::fail(500)]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();

        let err = call_upstream(&generator, &request(), &policy(30, 0, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TailorError::UpstreamExhausted { attempts: 1, .. }
        ));
        assert_eq!(scripted.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_timeout_stops_immediately() {
        let scripted = Arc::new(ScriptedGenerator::new(vec![
            Step::fail(500),
            Step::Slow(Duration::from_secs(60), "{}".into()),
            Step::reply("{}"),
        ]));
        let generator: Arc<dyn TextGenerator> = scripted.clone();

        let err = call_upstream(&generator, &request(), &policy(5, 3, 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TailorError::UpstreamTimeout { attempt: 2, .. }
        ));
        assert_eq!(scripted.calls(), 2);
    }
}
