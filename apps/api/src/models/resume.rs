use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// The canonical résumé. Built once per request by `schema::parse_resume`
/// and never mutated afterwards; the merger works on a clone.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    /// Display name of this résumé version, not the candidate.
    pub name: String,
    pub personal_info: PersonalInfo,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub skills: Skills,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub accent_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub gpa: Option<String>,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub link: Option<String>,
    pub highlights: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub date: String,
    pub credential_id: Option<String>,
    pub url: Option<String>,
}

/// Skills are either one flat list or named categories, never a mix.
/// Serializes as a JSON array or a JSON object respectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Skills {
    Flat(Vec<String>),
    Categorized(IndexMap<String, Vec<String>>),
}

impl Skills {
    /// Total number of skills across every category.
    pub fn count(&self) -> usize {
        match self {
            Skills::Flat(items) => items.len(),
            Skills::Categorized(groups) => groups.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl Default for Skills {
    fn default() -> Self {
        Skills::Flat(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_skills_serialize_as_array() {
        let skills = Skills::Flat(vec!["Rust".to_string(), "Go".to_string()]);
        assert_eq!(
            serde_json::to_value(&skills).unwrap(),
            serde_json::json!(["Rust", "Go"])
        );
    }

    #[test]
    fn test_categorized_skills_keep_insertion_order() {
        let mut groups = IndexMap::new();
        groups.insert("Languages".to_string(), vec!["Rust".to_string()]);
        groups.insert("Databases".to_string(), vec!["Postgres".to_string()]);
        let json = serde_json::to_string(&Skills::Categorized(groups)).unwrap();
        assert_eq!(json, r#"{"Languages":["Rust"],"Databases":["Postgres"]}"#);
    }

    #[test]
    fn test_empty_categories_count_as_no_skills() {
        let mut groups = IndexMap::new();
        groups.insert("Languages".to_string(), vec![]);
        assert!(Skills::Categorized(groups).is_empty());
        assert!(Skills::default().is_empty());
    }
}
