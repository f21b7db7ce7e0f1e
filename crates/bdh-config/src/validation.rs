//! Field validation for `.beadhub`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{ConfigError, WorkspaceConfig};

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").unwrap());
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*$").unwrap());
static SCP_ORIGIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^git@[^:\s]+:\S+$").unwrap());
static CANONICAL_ORIGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*/[A-Za-z0-9._-]+/[A-Za-z0-9._-]+$").unwrap());
static ALIAS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap());
static HUMAN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9 '\-]{0,63}$").unwrap());
static ROLE_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap());

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Normalize a role: 1-2 words, lowercased, single-space joined.
///
/// Returns `None` when the input does not qualify as a role.
pub fn normalize_role(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() || words.len() > 2 {
        return None;
    }
    if !words.iter().all(|w| ROLE_WORD_RE.is_match(w)) {
        return None;
    }
    let normalized = words.join(" ").to_lowercase();
    if normalized.len() > 50 {
        return None;
    }
    Some(normalized)
}

impl WorkspaceConfig {
    /// Validate every field, normalizing `role` in place.
    pub fn validate_and_normalize(&mut self) -> Result<(), ConfigError> {
        if !UUID_RE.is_match(&self.workspace_id) {
            return Err(invalid("workspace_id", "must be a lowercase UUID"));
        }
        if let Some(repo_id) = &self.repo_id {
            if !UUID_RE.is_match(repo_id) {
                return Err(invalid("repo_id", "must be a lowercase UUID"));
            }
        }
        if !URL_RE.is_match(&self.beadhub_url) {
            return Err(invalid(
                "beadhub_url",
                "must be an http(s) URL without whitespace",
            ));
        }
        if self.project_slug.len() > 63 || !SLUG_RE.is_match(&self.project_slug) {
            return Err(invalid(
                "project_slug",
                "must be lowercase alphanumeric/hyphens, at most 63 chars",
            ));
        }
        if !SCP_ORIGIN_RE.is_match(&self.repo_origin) && !URL_RE.is_match(&self.repo_origin) {
            return Err(invalid(
                "repo_origin",
                "must be git@host:path or an http(s) URL",
            ));
        }
        if !CANONICAL_ORIGIN_RE.is_match(&self.canonical_origin) {
            return Err(invalid(
                "canonical_origin",
                "must be host/org/repo with a lowercase host",
            ));
        }
        if !ALIAS_RE.is_match(&self.alias) {
            return Err(invalid(
                "alias",
                "must start alphanumeric and use only [A-Za-z0-9_-], at most 64 chars",
            ));
        }
        if !HUMAN_NAME_RE.is_match(&self.human_name) {
            return Err(invalid(
                "human_name",
                "must start with a letter and use letters, digits, spaces, ' or -, at most 64 chars",
            ));
        }
        if let Some(role) = &self.role {
            match normalize_role(role) {
                Some(normalized) => self.role = Some(normalized),
                None => {
                    return Err(invalid(
                        "role",
                        "must be 1-2 alphanumeric words, at most 50 chars normalized",
                    ));
                }
            }
        }
        Ok(())
    }
}
