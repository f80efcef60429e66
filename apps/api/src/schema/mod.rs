//! Canonical schema — turns untyped client JSON into a validated `Resume`.
//!
//! Legacy aliases (`portfolio`, `coursework`, `employer`, `role`, `github`)
//! resolve canonical-name-first. Skills, achievements and project
//! descriptions go through `coercion`. Invariants are checked after
//! coercion and every failing path is reported, not just the first.

pub mod coercion;
pub mod fields;

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::models::resume::{Certification, Education, Experience, PersonalInfo, Project, Resume};
use crate::models::tailor::TailorRequest;
use crate::schema::coercion::{coerce_achievements, coerce_project_description, coerce_skills};
use crate::schema::fields::{Fields, Len};

pub const SUMMARY_MAX_CHARS: usize = 2000;
const JOB_DESCRIPTION_LEN: Len = Len::between(50, 50_000);
const TARGET_ROLE_LEN: Len = Len::at_most(100);

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const ACCENT_COLOR_PATTERN: &str = r"^#[0-9A-Fa-f]{6}$";

// ────────────────────────────────────────────────────────────────────────────
// Violations
// ────────────────────────────────────────────────────────────────────────────

/// One offending field, addressed by its JSON path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

/// Every violation found in one validation pass, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldViolation {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldViolation> {
        self.0.iter()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.path.as_str()).collect()
    }

    fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    fn into_result<T>(self, value: T) -> Result<T, Violations> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{} field violation(s): {joined}", self.0.len())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request validation
// ────────────────────────────────────────────────────────────────────────────

/// A tailoring request whose résumé passed coercion and invariant checks.
#[derive(Debug, Clone)]
pub struct TailorJob {
    pub resume: Resume,
    pub job_description: String,
    pub preserve_structure: bool,
    pub target_role: Option<String>,
}

/// Validates the whole request body, collecting résumé and request-level
/// violations together.
pub fn validate_request(request: TailorRequest) -> Result<TailorJob, Violations> {
    let mut violations = Violations::default();

    let resume = match parse_resume(&request.resume) {
        Ok(resume) => Some(resume),
        Err(found) => {
            for v in found.0 {
                let path = if v.path.is_empty() {
                    "resume".to_string()
                } else {
                    format!("resume.{}", v.path)
                };
                violations.push(path, v.message);
            }
            None
        }
    };

    if let Err(message) = JOB_DESCRIPTION_LEN.check(request.job_description.trim()) {
        violations.push("jobDescription", message);
    }

    let target_role = request
        .target_role
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty());
    if let Some(role) = &target_role {
        if let Err(message) = TARGET_ROLE_LEN.check(role) {
            violations.push("targetRole", message);
        }
    }

    match resume {
        Some(resume) if violations.is_empty() => Ok(TailorJob {
            resume,
            job_description: request.job_description,
            preserve_structure: request.preserve_structure,
            target_role,
        }),
        _ => Err(violations),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Résumé parsing
// ────────────────────────────────────────────────────────────────────────────

/// Builds a canonical résumé from untyped JSON, or reports every violation.
pub fn parse_resume(value: &Value) -> Result<Resume, Violations> {
    let mut violations = Violations::default();

    let Some(map) = value.as_object() else {
        violations.push("", "expected an object");
        return Err(violations);
    };
    let root = Fields::root(map);
    let v = &mut violations;

    let id = root.required_str(v, &["id"], Len::between(1, usize::MAX));
    let name = root.required_str(v, &["name"], Len::between(1, 100));
    let personal_info = root
        .object(v, "personalInfo", true)
        .map(|info| read_personal_info(&info, v));
    let education = root.objects(v, "education", read_education);
    let experience = root.objects(v, "experience", read_experience);
    let skills = root
        .coerced(v, &["skills"], |value| coerce_skills(Some(value)))
        .unwrap_or_default();
    let projects = root.objects(v, "projects", read_project);
    let certifications = root.objects(v, "certifications", read_certification);
    let created_at = read_timestamp(&root, v, "createdAt");
    let updated_at = read_timestamp(&root, v, "updatedAt");
    let accent_color = root.optional_str(v, &["accentColor"], Len::ANY);
    if let Some(color) = &accent_color {
        if !accent_color_regex().is_match(color) {
            v.push("accentColor", "must be a hex color like #1e3a5f");
        }
    }

    let resume = Resume {
        id,
        name,
        personal_info: personal_info.unwrap_or_else(empty_personal_info),
        education,
        experience,
        skills,
        projects,
        certifications,
        created_at,
        updated_at,
        accent_color,
    };

    // Reported alongside shape errors rather than instead of them.
    violations.extend(invariant_violations(&resume));
    violations.into_result(resume)
}

/// Post-coercion invariants shared with the merger.
pub fn check_invariants(resume: &Resume) -> Result<(), Violations> {
    invariant_violations(resume).into_result(())
}

fn invariant_violations(resume: &Resume) -> Violations {
    let mut violations = Violations::default();
    if resume.skills.is_empty() {
        violations.push("skills", "at least one skill is required");
    }
    if resume.experience.is_empty() {
        violations.push("experience", "at least one work experience is required");
    }
    for (i, exp) in resume.experience.iter().enumerate() {
        if exp.description.is_empty() {
            violations.push(
                format!("experience[{i}].description"),
                "at least one description entry is required",
            );
        }
    }
    violations
}

fn read_personal_info(info: &Fields<'_>, v: &mut Violations) -> PersonalInfo {
    let email = info.required_str(v, &["email"], Len::ANY);
    if info.get(&["email"]).is_some() && !email_regex().is_match(&email) {
        v.push(info.path_of("email"), "must be a valid email address");
    }

    PersonalInfo {
        name: info.required_str(v, &["name"], Len::between(1, 100)),
        email,
        phone: info.optional_str(v, &["phone"], Len::at_most(20)),
        location: info.optional_str(v, &["location"], Len::at_most(100)),
        linkedin: info.optional_str(v, &["linkedin"], Len::ANY),
        github: info.optional_str(v, &["github"], Len::ANY),
        website: info.optional_str(v, &["website", "portfolio"], Len::ANY),
        summary: info.optional_str(v, &["summary"], Len::at_most(SUMMARY_MAX_CHARS)),
    }
}

fn read_education(entry: &Fields<'_>, v: &mut Violations) -> Education {
    Education {
        institution: entry.required_str(v, &["institution"], Len::between(1, 200)),
        degree: entry.required_str(v, &["degree"], Len::between(1, 200)),
        field: entry.optional_str(v, &["field"], Len::at_most(200)),
        start_date: entry.required_str(v, &["startDate"], Len::ANY),
        end_date: entry.required_str(v, &["endDate"], Len::ANY),
        gpa: entry.optional_str(v, &["gpa"], Len::ANY),
        achievements: entry
            .coerced(v, &["achievements", "coursework"], coerce_achievements)
            .unwrap_or_default(),
    }
}

fn read_experience(entry: &Fields<'_>, v: &mut Violations) -> Experience {
    // A missing description surfaces through the non-empty invariant.
    let description = entry.string_list(v, "description");

    Experience {
        company: entry.required_str(v, &["company", "employer"], Len::between(1, 200)),
        position: entry.required_str(v, &["position", "role"], Len::between(1, 200)),
        location: entry.optional_str(v, &["location"], Len::at_most(100)),
        start_date: entry.required_str(v, &["startDate"], Len::ANY),
        end_date: entry.required_str(v, &["endDate"], Len::ANY),
        description,
    }
}

fn read_project(entry: &Fields<'_>, v: &mut Violations) -> Project {
    let description = match entry.coerced(v, &["description"], coerce_project_description) {
        Some(text) => {
            if let Err(message) = Len::between(1, 1000).check(&text) {
                v.push(entry.path_of("description"), message);
            }
            text
        }
        None => {
            if entry.get(&["description"]).is_none() {
                v.push(entry.path_of("description"), "field required");
            }
            String::new()
        }
    };

    Project {
        name: entry.required_str(v, &["name"], Len::between(1, 200)),
        description,
        technologies: entry.string_list(v, "technologies"),
        link: entry.optional_str(v, &["link", "github"], Len::ANY),
        highlights: entry.string_list(v, "highlights"),
        start_date: entry.optional_str(v, &["startDate"], Len::ANY),
        end_date: entry.optional_str(v, &["endDate"], Len::ANY),
    }
}

fn read_certification(entry: &Fields<'_>, v: &mut Violations) -> Certification {
    Certification {
        name: entry.required_str(v, &["name"], Len::between(1, 200)),
        issuer: entry.required_str(v, &["issuer"], Len::between(1, 200)),
        date: entry.required_str(v, &["date"], Len::ANY),
        credential_id: entry.optional_str(v, &["credentialId"], Len::ANY),
        url: entry.optional_str(v, &["url"], Len::ANY),
    }
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
fn read_timestamp(root: &Fields<'_>, v: &mut Violations, name: &'static str) -> Option<DateTime<Utc>> {
    let raw = root.optional_str(v, &[name], Len::ANY)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Some(ts.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(_) => {
            v.push(root.path_of(name), "must be an ISO 8601 timestamp");
            None
        }
    }
}

fn empty_personal_info() -> PersonalInfo {
    PersonalInfo {
        name: String::new(),
        email: String::new(),
        phone: None,
        location: None,
        linkedin: None,
        github: None,
        website: None,
        summary: None,
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

fn accent_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ACCENT_COLOR_PATTERN).expect("accent color pattern is valid"))
}
