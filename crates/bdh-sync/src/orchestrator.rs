//! Full-vs-incremental sync decisions and the upload itself.
//!
//! The planning step is pure so the decision table is directly testable;
//! [`run_sync`] wraps it with file I/O, the RPC, and the watermark commit.
//! The watermark is only written after the server acknowledges with
//! `synced = true`.

use std::collections::{BTreeMap, HashSet};
use std::fs;

use camino::Utf8Path;
use serde_json::Value;
use tracing::{debug, info};

use bdh_client::api::{SyncRequest, SyncResponse};
use bdh_client::BeadHubClient;

use crate::state::{SYNC_PROTOCOL_VERSION, SyncState};
use crate::{SyncError, diff};

/// Workspace identity carried on every sync request.
#[derive(Debug, Clone)]
pub struct WorkspaceIdentity {
    pub workspace_id: String,
    pub repo_id: Option<String>,
    pub project_slug: String,
}

/// What a sync attempt decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    /// Upload the whole store: empty watermark or a protocol change.
    Full { issues_jsonl: String },
    /// Upload only the delta against the watermark.
    Incremental {
        changed_ids: Vec<String>,
        deleted_ids: Vec<String>,
        changed_issues: String,
    },
    /// Nothing differs; refresh the watermark timestamp without an RPC.
    NoChanges,
}

/// Result reported back to the CLI for its notification line.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub plan: SyncPlan,
    pub issues_count: Option<i64>,
}

/// Hash every issue line of the store. Lines without a usable `id` are
/// skipped; malformed JSON aborts with line context.
pub fn compute_hashes(store_bytes: &[u8]) -> Result<BTreeMap<String, String>, SyncError> {
    let mut hashes = BTreeMap::new();
    for (_line, value) in bdh_jsonl::parse_all(store_bytes)? {
        let Some(id) = value.get("id").and_then(Value::as_str) else {
            continue;
        };
        if id.is_empty() {
            continue;
        }
        hashes.insert(id.to_string(), bdh_hash::hash_value(&value)?);
    }
    Ok(hashes)
}

/// Apply the decision table to a loaded watermark and freshly hashed store.
#[must_use]
pub fn plan_sync(
    state: &SyncState,
    current: &BTreeMap<String, String>,
    store_bytes: &[u8],
) -> SyncPlan {
    if state.needs_full_sync() {
        return SyncPlan::Full {
            issues_jsonl: String::from_utf8_lossy(store_bytes).into_owned(),
        };
    }

    let changed_ids = diff::find_changed(current, &state.issue_hashes);
    let deleted_ids = diff::find_deleted(current, &state.issue_hashes);
    if changed_ids.is_empty() && deleted_ids.is_empty() {
        return SyncPlan::NoChanges;
    }

    let wanted: HashSet<String> = changed_ids.iter().cloned().collect();
    SyncPlan::Incremental {
        changed_issues: bdh_jsonl::extract_by_id(store_bytes, &wanted),
        changed_ids,
        deleted_ids,
    }
}

/// Build the wire request for a plan. `NoChanges` has no RPC.
#[must_use]
pub fn build_request(identity: &WorkspaceIdentity, plan: &SyncPlan) -> Option<SyncRequest> {
    let base = SyncRequest {
        workspace_id: identity.workspace_id.clone(),
        repo_id: identity.repo_id.clone(),
        project_slug: identity.project_slug.clone(),
        sync_protocol_version: SYNC_PROTOCOL_VERSION,
        sync_mode: None,
        issues_jsonl: None,
        changed_issues: None,
        deleted_ids: None,
    };

    match plan {
        SyncPlan::Full { issues_jsonl } => Some(SyncRequest {
            issues_jsonl: Some(issues_jsonl.clone()),
            ..base
        }),
        SyncPlan::Incremental {
            changed_issues,
            deleted_ids,
            ..
        } => Some(SyncRequest {
            sync_mode: Some("incremental".to_string()),
            changed_issues: Some(changed_issues.clone()),
            deleted_ids: Some(deleted_ids.clone()),
            ..base
        }),
        SyncPlan::NoChanges => None,
    }
}

/// Run one sync attempt end to end. `command_line` is the tracker
/// invocation that triggered this sync, kept for the trace.
///
/// On any error the watermark is left untouched; the next invocation
/// re-diffs from the same basis.
pub async fn run_sync(
    client: &BeadHubClient,
    identity: &WorkspaceIdentity,
    issues_path: &Utf8Path,
    state_path: &Utf8Path,
    command_line: &[String],
) -> Result<SyncOutcome, SyncError> {
    debug!(?command_line, "sync triggered");
    let store_bytes = match fs::read(issues_path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(source) => {
            return Err(SyncError::Io {
                path: issues_path.to_string(),
                source,
            });
        }
    };

    let mut state = SyncState::load(state_path);
    let current = compute_hashes(&store_bytes)?;
    let plan = plan_sync(&state, &current, &store_bytes);

    let response: Option<SyncResponse> = match build_request(identity, &plan) {
        Some(request) => {
            debug!(
                mode = request.sync_mode.as_deref().unwrap_or("full"),
                issues = current.len(),
                "uploading issue sync"
            );
            let response = client.sync_issues(&request).await?;
            if !response.synced {
                return Err(SyncError::NotAcknowledged);
            }
            Some(response)
        }
        None => {
            debug!("issue store unchanged, refreshing watermark only");
            None
        }
    };

    let issues_count = response.as_ref().and_then(|r| r.issues_count);
    state.update(current);
    if let Some(version) = response.as_ref().and_then(|r| r.sync_protocol_version) {
        state.protocol_version = version;
    }
    state.save(state_path)?;

    if let SyncPlan::Incremental {
        changed_ids,
        deleted_ids,
        ..
    } = &plan
    {
        info!(
            changed = changed_ids.len(),
            deleted = deleted_ids.len(),
            "incremental sync complete"
        );
    }

    Ok(SyncOutcome { plan, issues_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &[u8] = b"{\"id\":\"bd-1\",\"title\":\"one\"}\n{\"id\":\"bd-2\",\"title\":\"two\"}\n{\"id\":\"bd-3\",\"title\":\"three\"}\n";

    fn identity() -> WorkspaceIdentity {
        WorkspaceIdentity {
            workspace_id: "01234567-89ab-4cde-8f01-23456789abcd".into(),
            repo_id: None,
            project_slug: "widgets".into(),
        }
    }

    #[test]
    fn hashes_cover_every_line_with_an_id() {
        let hashes = compute_hashes(STORE).unwrap();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.values().all(|h| h.starts_with("v1:")));
    }

    #[test]
    fn lines_without_ids_are_skipped_by_hashing() {
        let bytes = b"{\"id\":\"bd-1\"}\n{\"note\":\"no id\"}\n{\"id\":\"\"}\n";
        let hashes = compute_hashes(bytes).unwrap();
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains_key("bd-1"));
    }

    #[test]
    fn malformed_store_is_a_hard_error() {
        assert!(compute_hashes(b"{\"id\":\"bd-1\"}\n{oops\n").is_err());
    }

    #[test]
    fn empty_watermark_plans_a_full_sync() {
        let state = SyncState::default();
        let current = compute_hashes(STORE).unwrap();

        let plan = plan_sync(&state, &current, STORE);
        let SyncPlan::Full { issues_jsonl } = &plan else {
            panic!("expected full sync, got {plan:?}");
        };
        assert_eq!(issues_jsonl.as_bytes(), STORE);

        let request = build_request(&identity(), &plan).unwrap();
        assert!(request.sync_mode.is_none());
        assert!(request.issues_jsonl.is_some());
        assert!(request.changed_issues.is_none());
        assert_eq!(request.sync_protocol_version, SYNC_PROTOCOL_VERSION);
    }

    #[test]
    fn stale_protocol_version_plans_a_full_sync() {
        let mut state = SyncState::default();
        let current = compute_hashes(STORE).unwrap();
        state.update(current.clone());
        state.protocol_version = SYNC_PROTOCOL_VERSION + 1;

        assert!(matches!(
            plan_sync(&state, &current, STORE),
            SyncPlan::Full { .. }
        ));
    }

    #[test]
    fn unchanged_store_plans_no_rpc() {
        let mut state = SyncState::default();
        let current = compute_hashes(STORE).unwrap();
        state.update(current.clone());

        let plan = plan_sync(&state, &current, STORE);
        assert_eq!(plan, SyncPlan::NoChanges);
        assert!(build_request(&identity(), &plan).is_none());
    }

    #[test]
    fn modified_and_deleted_issues_plan_an_incremental_sync() {
        let mut state = SyncState::default();
        let before = compute_hashes(STORE).unwrap();
        state.update(before);

        // bd-2 edited, bd-3 deleted, bd-4 created.
        let after: &[u8] = b"{\"id\":\"bd-1\",\"title\":\"one\"}\n{\"id\":\"bd-2\",\"title\":\"edited\"}\n{\"id\":\"bd-4\",\"title\":\"four\"}\n";
        let current = compute_hashes(after).unwrap();

        let plan = plan_sync(&state, &current, after);
        let SyncPlan::Incremental {
            changed_ids,
            deleted_ids,
            changed_issues,
        } = &plan
        else {
            panic!("expected incremental sync, got {plan:?}");
        };
        assert_eq!(changed_ids, &["bd-2", "bd-4"]);
        assert_eq!(deleted_ids, &["bd-3"]);
        assert_eq!(
            changed_issues,
            "{\"id\":\"bd-2\",\"title\":\"edited\"}\n{\"id\":\"bd-4\",\"title\":\"four\"}"
        );

        let request = build_request(&identity(), &plan).unwrap();
        assert_eq!(request.sync_mode.as_deref(), Some("incremental"));
        assert!(request.issues_jsonl.is_none());
        assert_eq!(request.deleted_ids.as_deref(), Some(&["bd-3".to_string()][..]));
    }

    #[test]
    fn full_sync_of_an_empty_store_sends_empty_jsonl() {
        let plan = plan_sync(&SyncState::default(), &BTreeMap::new(), b"");
        assert_eq!(
            plan,
            SyncPlan::Full {
                issues_jsonl: String::new()
            }
        );
    }
}
