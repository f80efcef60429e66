//! Legacy-shape coercions shared by the inbound schema and the merger.
//!
//! Every function here is total over JSON input: a shape it cannot map
//! yields an `Err` with a human-readable reason, never a panic.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::models::resume::Skills;

/// Separators accepted in single-string skill lists.
const SKILL_SEPARATORS: &[char] = &[',', ';', '\n'];

/// Splits a delimited skill string, trimming entries and dropping empties.
pub fn split_items(raw: &str) -> Vec<String> {
    raw.split(SKILL_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Splits newline-delimited text into trimmed, non-empty lines.
pub fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Renders a JSON scalar as text. Objects, arrays and null are not scalars.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trims every element of a JSON array and drops the empty ones.
fn trimmed_list(items: &[Value]) -> Result<Vec<String>, String> {
    items
        .iter()
        .map(|item| {
            scalar_text(item)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| format!("expected text entries, found {}", kind_of(item)))
        })
        .filter(|entry| !matches!(entry, Ok(s) if s.is_empty()))
        .collect()
}

/// Reads a list-or-string field: arrays are trimmed, strings are split with `split`.
fn list_or_split(value: &Value, split: fn(&str) -> Vec<String>) -> Result<Vec<String>, String> {
    match value {
        Value::Array(items) => trimmed_list(items),
        Value::String(raw) => Ok(split(raw)),
        Value::Null => Ok(Vec::new()),
        other => Err(format!("expected a list or a string, found {}", kind_of(other))),
    }
}

/// Maps any accepted skills shape onto one of the two canonical variants.
///
/// Order of checks:
/// 1. object `{category: list | "a, b"}` → `Categorized`
/// 2. array of `{category, skills | items}` objects → `Categorized`
/// 3. array of strings → `Flat`
/// 4. delimited string → `Flat`
/// 5. null / absent → empty `Flat` (rejected later by the invariant check)
pub fn coerce_skills(value: Option<&Value>) -> Result<Skills, String> {
    let value = match value {
        None | Some(Value::Null) => return Ok(Skills::default()),
        Some(v) => v,
    };

    match value {
        Value::Object(groups) => {
            let mut categorized = IndexMap::new();
            for (category, entries) in groups {
                let items = list_or_split(entries, split_items)
                    .map_err(|e| format!("category '{category}': {e}"))?;
                push_category(&mut categorized, category, items);
            }
            Ok(Skills::Categorized(categorized))
        }
        Value::Array(items) if items.is_empty() => Ok(Skills::default()),
        Value::Array(items) if items.iter().all(is_category_group) => {
            let mut categorized = IndexMap::new();
            for group in items.iter().filter_map(Value::as_object) {
                let category = group
                    .get("category")
                    .and_then(scalar_text)
                    .unwrap_or_default();
                let entries = group
                    .get("skills")
                    .filter(|v| !v.is_null())
                    .or_else(|| group.get("items"))
                    .unwrap_or(&Value::Null);
                let items = list_or_split(entries, split_items)
                    .map_err(|e| format!("category '{category}': {e}"))?;
                push_category(&mut categorized, &category, items);
            }
            Ok(Skills::Categorized(categorized))
        }
        Value::Array(items) => trimmed_list(items).map(Skills::Flat),
        Value::String(raw) => Ok(Skills::Flat(split_items(raw))),
        other => Err(format!(
            "expected a list, a string or a category mapping, found {}",
            kind_of(other)
        )),
    }
}

fn is_category_group(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|group| group.contains_key("category"))
}

/// Repeated category names fold into the first occurrence so keys stay unique.
fn push_category(groups: &mut IndexMap<String, Vec<String>>, category: &str, items: Vec<String>) {
    groups
        .entry(category.trim().to_string())
        .or_default()
        .extend(items);
}

/// Education achievements: newline-delimited strings are split into entries.
pub fn coerce_achievements(value: &Value) -> Result<Vec<String>, String> {
    list_or_split(value, split_lines)
}

/// Project description: legacy lists are joined into one paragraph.
pub fn coerce_project_description(value: &Value) -> Result<String, String> {
    match value {
        Value::Array(items) => Ok(trimmed_list(items)?.join(" ")),
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected a string or a list, found {}", kind_of(other))),
    }
}

/// Reads AI-authored bullet text: a string is split on newlines, a list
/// keeps its text entries. Anything else, or an empty result, is `None`.
pub fn coerce_bullets(value: &Value) -> Option<Vec<String>> {
    let bullets = match value {
        Value::String(raw) => split_lines(raw),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => return None,
    };
    (!bullets.is_empty()).then_some(bullets)
}

/// Short type name used in violation messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Collects the text entries of an optional JSON array; anything else is empty.
pub fn text_entries(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(scalar_text).collect())
        .unwrap_or_default()
}

/// Looks up the first non-null key among `names` (canonical name first).
pub fn first_present<'a>(map: &'a Map<String, Value>, names: &[&'a str]) -> Option<(&'a str, &'a Value)> {
    names
        .iter()
        .find_map(|&name| map.get(name).filter(|v| !v.is_null()).map(|v| (name, v)))
}
