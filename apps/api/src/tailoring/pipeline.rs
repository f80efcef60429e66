//! The tailoring pipeline: project → prompt → call → parse → merge → score.
//!
//! Stages run strictly in sequence; the first failing stage ends the run.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::llm_client::prompts::with_json_enforcement;
use crate::llm_client::{GenerationRequest, TextGenerator};
use crate::models::tailor::TailorResponse;
use crate::schema::coercion::text_entries;
use crate::schema::TailorJob;
use crate::tailoring::error::TailorError;
use crate::tailoring::merger::{content_of, merge};
use crate::tailoring::orchestrator::{call_upstream, CallPolicy};
use crate::tailoring::projector::{project, MinimalResume};
use crate::tailoring::prompts::{
    render, FLEXIBLE_STRUCTURE_DIRECTIVE, PRESERVE_STRUCTURE_DIRECTIVE, SYSTEM_INSTRUCTION,
    TAILORING_PROMPT_TEMPLATE,
};
use crate::tailoring::repair::parse_response;
use crate::tailoring::scoring::ats_score;

/// Sampling settings and call policy for every tailoring call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TailorSettings {
    pub policy: CallPolicy,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for TailorSettings {
    fn default() -> Self {
        Self {
            policy: CallPolicy::default(),
            temperature: 0.7,
            max_output_tokens: 16_384,
        }
    }
}

/// Runs tailoring jobs against one shared upstream client.
#[derive(Clone)]
pub struct TailorService {
    generator: Arc<dyn TextGenerator>,
    settings: TailorSettings,
}

impl TailorService {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: TailorSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        self.generator.model()
    }

    pub async fn run(&self, job: TailorJob) -> Result<TailorResponse, TailorError> {
        let started = Instant::now();
        let minimal = project(&job.resume);
        let request = GenerationRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            user_prompt: build_prompt(&job, &minimal)?,
            temperature: self.settings.temperature,
            max_output_tokens: self.settings.max_output_tokens,
        };

        let raw = call_upstream(&self.generator, &request, &self.settings.policy).await?;
        let parsed = parse_response(&raw)?;
        let tailored_resume = merge(&job.resume, &parsed)?;

        let matched_keywords = report_list(&parsed, "matchedKeywords");
        let missing_keywords = report_list(&parsed, "missingKeywords");
        let ats_score = ats_score(matched_keywords.len(), missing_keywords.len());

        info!(
            resume_id = %job.resume.id,
            ats_score,
            matched = matched_keywords.len(),
            missing = missing_keywords.len(),
            duration_ms = started.elapsed().as_millis(),
            "tailoring completed"
        );

        Ok(TailorResponse {
            tailored_resume,
            ats_score,
            matched_keywords,
            missing_keywords,
            suggestions: report_list(&parsed, "suggestions"),
            changes: report_list(&parsed, "changes"),
        })
    }
}

/// Report lists live at the top level, but some replies nest them with the
/// rewritten content. Missing or wrong-typed lists are empty.
fn report_list(parsed: &Map<String, Value>, key: &str) -> Vec<String> {
    let value = parsed.get(key).or_else(|| content_of(parsed).get(key));
    if value.is_some_and(|v| !v.is_array()) {
        warn!(key, "report field is not a list; ignoring");
    }
    text_entries(value)
}

/// Fills the tailoring template in a single pass, so placeholder-like text
/// inside the résumé or the job description is never substituted.
fn build_prompt(job: &TailorJob, minimal: &MinimalResume) -> Result<String, TailorError> {
    let resume_json = serde_json::to_string_pretty(minimal)?;
    let target_role = job
        .target_role
        .as_deref()
        .unwrap_or("Not specified (infer from the job description)");
    let structure = if job.preserve_structure {
        PRESERVE_STRUCTURE_DIRECTIVE
    } else {
        FLEXIBLE_STRUCTURE_DIRECTIVE
    };

    let prompt = render(
        TAILORING_PROMPT_TEMPLATE,
        &[
            ("candidate_name", job.resume.personal_info.name.as_str()),
            ("target_role", target_role),
            ("structure_directive", structure),
            ("resume_json", resume_json.as_str()),
            ("job_description", job.job_description.as_str()),
        ],
    );

    Ok(with_json_enforcement(&prompt))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::llm_client::mock::{ScriptedGenerator, Step};
    use crate::models::resume::Skills;
    use crate::models::tailor::TailorRequest;
    use crate::schema::validate_request;
    use serde_json::json;

    fn job(preserve_structure: bool, target_role: Option<&str>) -> TailorJob {
        let request: TailorRequest = serde_json::from_value(json!({
            "resume": {
                "id": "r1",
                "name": "Backend resume",
                "personalInfo": {"name": "Jane Doe", "email": "jane@example.com"},
                "experience": [{
                    "company": "Acme",
                    "position": "Engineer",
                    "startDate": "2020",
                    "endDate": "Present",
                    "description": ["Built APIs"]
                }],
                "skills": ["Python", "Go"],
                "projects": [{"name": "alpha", "description": "A tool"}]
            },
            "jobDescription": "We need a backend engineer with Rust, Kubernetes and PostgreSQL experience.",
            "preserveStructure": preserve_structure,
            "targetRole": target_role
        }))
        .unwrap();
        validate_request(request).unwrap()
    }

    fn settings() -> TailorSettings {
        TailorSettings {
            policy: CallPolicy {
                timeout: Duration::from_secs(5),
                max_retries: 1,
                base_delay: Duration::from_secs(1),
            },
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }

    fn service(steps: Vec<Step>) -> (TailorService, Arc<ScriptedGenerator>) {
        let scripted = Arc::new(ScriptedGenerator::new(steps));
        (TailorService::new(scripted.clone(), settings()), scripted)
    }

    #[test]
    fn test_prompt_contents() {
        let job = job(true, Some("Platform Engineer"));
        let prompt = build_prompt(&job, &project(&job.resume)).unwrap();

        assert!(prompt.contains("CANDIDATE: Jane Doe"));
        assert!(prompt.contains("TARGET ROLE: Platform Engineer"));
        assert!(prompt.contains(PRESERVE_STRUCTURE_DIRECTIVE));
        assert!(prompt.contains("\"Primary Skills\""));
        assert!(prompt.contains("Kubernetes"));
        assert!(!prompt.contains("jane@example.com"));
        assert!(!prompt.contains("{resume_json}"));
    }

    #[test]
    fn test_prompt_does_not_substitute_placeholders_in_user_text() {
        let mut job = job(true, None);
        job.resume.personal_info.name = "Jane {job_description}".into();
        job.resume.experience[0].description = vec!["Wrote {resume_json} parsers".into()];
        job.job_description.push_str(" Bonus: {candidate_name}.");

        let prompt = build_prompt(&job, &project(&job.resume)).unwrap();

        assert!(prompt.contains("CANDIDATE: Jane {job_description}"));
        assert!(prompt.contains("Wrote {resume_json} parsers"));
        assert!(prompt.contains("Bonus: {candidate_name}."));
        assert_eq!(prompt.matches("We need a backend engineer").count(), 1);
    }

    #[test]
    fn test_prompt_without_target_role() {
        let job = job(false, None);
        let prompt = build_prompt(&job, &project(&job.resume)).unwrap();
        assert!(prompt.contains("TARGET ROLE: Not specified"));
        assert!(prompt.contains(FLEXIBLE_STRUCTURE_DIRECTIVE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_merges_and_scores() {
        let reply = json!({
            "summary": "Backend engineer focused on Rust services",
            "experiences": [{"company": "Acme", "description": ["Built Rust APIs on Kubernetes"]}],
            "skills": {"Backend": ["Rust", "Python", "Go"]},
            "matchedKeywords": ["Rust", "Kubernetes", "Python", "Go"],
            "missingKeywords": ["PostgreSQL"],
            "suggestions": ["Mention database work"],
            "changes": ["Rewrote summary"]
        });
        let (service, scripted) = service(vec![Step::reply(reply.to_string())]);

        let response = service.run(job(true, None)).await.unwrap();

        assert_eq!(response.ats_score, 80);
        assert_eq!(response.missing_keywords, vec!["PostgreSQL"]);
        assert_eq!(response.changes, vec!["Rewrote summary"]);
        assert_eq!(
            response.tailored_resume.experience[0].description,
            vec!["Built Rust APIs on Kubernetes"]
        );
        assert!(matches!(response.tailored_resume.skills, Skills::Categorized(_)));

        let sent = &scripted.requests()[0];
        assert_eq!(sent.system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(sent.temperature, 0.2);
        assert_eq!(sent.max_output_tokens, 2048);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_repairs_truncated_reply() {
        let raw = "```json\n{\"tailoredResume\":{\"summary\":\"Rust engineer";
        let (service, _) = service(vec![Step::reply(raw)]);

        let response = service.run(job(true, None)).await.unwrap();

        assert_eq!(
            response.tailored_resume.personal_info.summary.as_deref(),
            Some("Rust engineer")
        );
        assert_eq!(response.ats_score, 75);
        assert!(response.matched_keywords.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_surfaces_malformed_reply() {
        let (service, _) = service(vec![Step::reply("not json at all")]);
        let err = service.run(job(true, None)).await.unwrap_err();
        assert_eq!(err.stage(), "parser");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_surfaces_exhausted_budget() {
        let (service, scripted) = service(vec![Step::fail(500)]);
        let err = service.run(job(true, None)).await.unwrap_err();
        assert!(matches!(err, TailorError::UpstreamExhausted { attempts: 2, .. }));
        assert_eq!(scripted.calls(), 2);
    }

    #[test]
    fn test_report_list_reads_nested_and_ignores_wrong_types() {
        let parsed = match json!({
            "tailoredResume": {"matchedKeywords": ["Rust"]},
            "missingKeywords": "Go"
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        assert_eq!(report_list(&parsed, "matchedKeywords"), vec!["Rust"]);
        assert!(report_list(&parsed, "missingKeywords").is_empty());
    }
}
