//! Scripted `TextGenerator` double for orchestrator, pipeline and router tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{GenerationRequest, LlmError, TextGenerator};

/// What the double does on one call.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail { status: u16, message: String },
    /// Sleeps, then replies. Used to trip the orchestrator deadline.
    Slow(Duration, String),
}

impl Step {
    pub fn reply(text: impl Into<String>) -> Self {
        Step::Reply(text.into())
    }

    pub fn fail(status: u16) -> Self {
        Step::Fail {
            status,
            message: format!("simulated upstream failure ({status})"),
        }
    }
}

/// Plays `steps` in order; the last step repeats once the script runs out.
pub struct ScriptedGenerator {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    calls: AtomicU32,
    call_times: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().expect("lock").clone()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("lock").clone()
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().expect("lock").pop_front();
        let mut last = self.last.lock().expect("lock");
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().unwrap_or_else(|| Step::fail(500)),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().expect("lock").push(Instant::now());
        self.requests.lock().expect("lock").push(request.clone());

        match self.next_step() {
            Step::Reply(text) => Ok(text),
            Step::Fail { status, message } => Err(LlmError::Api { status, message }),
            Step::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}
