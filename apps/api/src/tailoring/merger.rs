//! Reconciliation Merger — folds an untrusted, partial AI result into a copy
//! of the canonical résumé.
//!
//! Every field is read with an explicit presence/type check; anything
//! missing, wrong-typed or empty leaves the original value in place.
//! Invariants are re-checked at the end and a violation fails the merge.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::resume::Resume;
use crate::schema::coercion::{coerce_bullets, coerce_skills, scalar_text};
use crate::schema::{check_invariants, SUMMARY_MAX_CHARS};
use crate::tailoring::error::TailorError;

/// Key under which some responses nest the rewritten content.
const NESTED_CONTENT_KEY: &str = "tailoredResume";

/// Rewritten content, or the payload itself when it is flat.
pub fn content_of(ai: &Map<String, Value>) -> &Map<String, Value> {
    ai.get(NESTED_CONTENT_KEY)
        .and_then(Value::as_object)
        .unwrap_or(ai)
}

pub fn merge(original: &Resume, ai: &Map<String, Value>) -> Result<Resume, TailorError> {
    let content = content_of(ai);
    let mut merged = original.clone();

    if let Some(summary) = content.get("summary").and_then(Value::as_str) {
        let summary = summary.trim();
        let chars = summary.chars().count();
        if summary.is_empty() {
            debug!("upstream summary empty; keeping original");
        } else if chars > SUMMARY_MAX_CHARS {
            warn!(chars, max = SUMMARY_MAX_CHARS, "upstream summary too long; keeping original");
        } else {
            merged.personal_info.summary = Some(summary.to_string());
        }
    }

    let descriptions = keyed_entries(content.get("experiences"), "company", "description");
    for exp in merged.experience.iter_mut() {
        if let Some(bullets) = lookup(&descriptions, &exp.company) {
            exp.description = bullets;
        }
    }

    let highlights = keyed_entries(content.get("projects"), "name", "highlights");
    for proj in merged.projects.iter_mut() {
        if let Some(bullets) = lookup(&highlights, &proj.name) {
            proj.highlights = bullets;
        }
    }

    if let Some(raw) = content.get("skills") {
        match coerce_skills(Some(raw)) {
            Ok(skills) if !skills.is_empty() => merged.skills = skills,
            Ok(_) => debug!("upstream skills empty; keeping original"),
            Err(reason) => warn!(%reason, "upstream skills unreadable; keeping original"),
        }
    }

    check_invariants(&merged).map_err(|violations| {
        warn!(%violations, "merged resume violates invariants");
        TailorError::Reconciliation(violations)
    })?;

    Ok(merged)
}

/// Reads `[{<key>: name, <field>: bullets}, ...]` or `{name: bullets}` into
/// `(name, bullets)` pairs, skipping entries without a readable name or
/// with no non-empty bullet text.
fn keyed_entries(value: Option<&Value>, key: &str, field: &str) -> Vec<(String, Vec<String>)> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|entry| {
                let name = entry.get(key).and_then(scalar_text)?;
                let bullets = entry.get(field).and_then(coerce_bullets)?;
                Some((name, bullets))
            })
            .collect(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(name, raw)| coerce_bullets(raw).map(|b| (name.clone(), b)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Exact-name match; the first entry for a name wins.
fn lookup(entries: &[(String, Vec<String>)], name: &str) -> Option<Vec<String>> {
    entries
        .iter()
        .find(|(candidate, _)| candidate == name)
        .map(|(_, bullets)| bullets.clone())
}
