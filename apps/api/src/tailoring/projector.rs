//! Minimal Content Projector — the token-minimal slice of a résumé sent upstream.
//!
//! Lossy on purpose: dates, contact details, education and certifications
//! never leave the process. The projection is never merged back directly.

use indexmap::IndexMap;
use serde::Serialize;

use crate::models::resume::{Resume, Skills};

/// Max skills per synthetic category when a flat list is partitioned.
const SKILLS_PER_GROUP: usize = 6;
const PRIMARY_GROUP: &str = "Primary Skills";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimalResume {
    pub summary: String,
    pub experiences: Vec<MinimalExperience>,
    pub projects: Vec<MinimalProject>,
    pub skills: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimalExperience {
    pub company: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinimalProject {
    pub name: String,
    pub highlights: Vec<String>,
}

pub fn project(resume: &Resume) -> MinimalResume {
    MinimalResume {
        summary: resume.personal_info.summary.clone().unwrap_or_default(),
        experiences: resume
            .experience
            .iter()
            .map(|exp| MinimalExperience {
                company: exp.company.clone(),
                description: exp.description.clone(),
            })
            .collect(),
        projects: resume
            .projects
            .iter()
            .map(|proj| MinimalProject {
                name: proj.name.clone(),
                highlights: if proj.highlights.is_empty() {
                    vec![proj.description.clone()]
                } else {
                    proj.highlights.clone()
                },
            })
            .collect(),
        skills: categorize(&resume.skills),
    }
}

/// Always categorized for transmission. Flat lists are chunked into
/// "Primary Skills", "Skills Set 2", "Skills Set 3", ...
fn categorize(skills: &Skills) -> IndexMap<String, Vec<String>> {
    match skills {
        Skills::Categorized(groups) => groups.clone(),
        Skills::Flat(items) => items
            .chunks(SKILLS_PER_GROUP)
            .enumerate()
            .map(|(i, chunk)| {
                let name = if i == 0 {
                    PRIMARY_GROUP.to_string()
                } else {
                    format!("Skills Set {}", i + 1)
                };
                (name, chunk.to_vec())
            })
            .collect(),
    }
}
