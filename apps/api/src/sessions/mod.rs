//! Session artifacts — one directory per tailoring run.
//!
//! Layout: `<root>/<candidate>/<resumeId>/<YYYYmmdd-HHMMSS>-<role|general>/`
//! holding `<Candidate_Name>_Tailored_<YYYY-MM-DD>.json`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::models::tailor::TailorResponse;

/// Opaque handle to a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: Uuid,
    pub path: PathBuf,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(
        &self,
        response: &TailorResponse,
        resume_id: &str,
        candidate: &str,
        target_role: Option<&str>,
    ) -> Result<SessionHandle>;
}

/// Writes sessions under a root directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(
        &self,
        resume_id: &str,
        candidate: &str,
        target_role: Option<&str>,
        now: DateTime<Utc>,
    ) -> PathBuf {
        let role = target_role.map(sanitize).unwrap_or_else(|| "general".to_string());
        self.root
            .join(sanitize(candidate))
            .join(sanitize(resume_id))
            .join(format!("{}-{role}", now.format("%Y%m%d-%H%M%S")))
    }
}

#[async_trait]
impl SessionStore for FsSessionStore {
    async fn save(
        &self,
        response: &TailorResponse,
        resume_id: &str,
        candidate: &str,
        target_role: Option<&str>,
    ) -> Result<SessionHandle> {
        let now = Utc::now();
        let dir = self.session_dir(resume_id, candidate, target_role, now);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create session directory {}", dir.display()))?;

        let file = dir.join(artifact_file_name(candidate, now));
        let body = serde_json::to_vec_pretty(response).context("failed to encode session JSON")?;
        tokio::fs::write(&file, body)
            .await
            .with_context(|| format!("failed to write {}", file.display()))?;

        Ok(SessionHandle {
            id: Uuid::new_v4(),
            path: file,
        })
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("valid path component regex"))
}

/// Maps a free-text value onto `[A-Za-z0-9_-]`; empty becomes `unknown`.
pub fn sanitize(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "unknown".to_string();
    }
    unsafe_chars().replace_all(trimmed, "_").into_owned()
}

fn artifact_file_name(candidate: &str, now: DateTime<Utc>) -> String {
    format!("{}_Tailored_{}.json", sanitize(candidate), now.format("%Y-%m-%d"))
}
