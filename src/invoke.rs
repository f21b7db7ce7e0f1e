//! The per-invocation control flow.
//!
//! resolve config and store locations → pre-flight gate → run the tracker →
//! sync if the subcommand mutates the store → print deferred notifications.
//! Coordination failures never block the tracker; they become notifications.

use std::process::Command as StdCommand;

use anyhow::Result;
use camino::Utf8PathBuf;

use bdh_client::BeadHubClient;
use bdh_config::{ConfigError, DiscoveredConfig, WorkspaceConfig};
use bdh_gate::{
    Notifications, PreflightOutcome, PresenceContext, is_mutating, preflight, refresh_presence,
    strip_jump_in,
};
use bdh_sync::{SyncPlan, WorkspaceIdentity, run_sync, sync_state_path};
use bdh_utils::store::beads_dir;

/// File the tracker keeps its issues in, inside the `.beads` directory.
pub const ISSUES_FILE_NAME: &str = "issues.jsonl";

/// Environment variable carrying the bearer token for the BeadHub service.
pub const API_KEY_ENV: &str = "BEADHUB_API_KEY";

/// Run a tracker command under coordination, returning the process exit code.
pub async fn run_bd(raw_args: Vec<String>) -> Result<i32> {
    let (args, jump_in) = strip_jump_in(&raw_args);
    let mut notifications = Notifications::new();

    let discovered = load_config_tolerantly(&mut notifications);
    let client = discovered.as_ref().and_then(|d| {
        match BeadHubClient::new(&d.config.beadhub_url, api_key()) {
            Ok(client) => Some(client),
            Err(err) => {
                notifications.push(format!("coordination disabled: {err}"));
                None
            }
        }
    });

    let mutating = is_mutating(&args);
    let mut rejected = false;

    if let (Some(discovered), Some(client)) = (&discovered, &client) {
        if mutating {
            let outcome = preflight(client, &discovered.config, &args, &mut notifications).await;
            if let PreflightOutcome::Rejected { .. } = outcome {
                if jump_in {
                    notifications.push("pre-flight rejection overridden (--:jump-in)".to_string());
                } else {
                    rejected = true;
                }
            }
        }
        let context = PresenceContext {
            program: Some("bdh".to_string()),
            model: None,
            branch: current_branch(),
        };
        refresh_presence(client, &discovered.config, &context, &mut notifications).await;
    }

    let output = crate::tracker::run_tracker(&args).await?;
    output.forward();

    if mutating {
        if let (Some(discovered), Some(client)) = (&discovered, &client) {
            sync_issue_store(client, discovered, &args, &mut notifications).await;
        }
    }

    notifications.print_to_stderr();

    // A rejection without the override surfaces as a non-zero exit, but a
    // tracker failure always wins.
    if rejected && output.exit_code == 0 {
        return Ok(1);
    }
    Ok(output.exit_code)
}

fn load_config_tolerantly(notifications: &mut Notifications) -> Option<DiscoveredConfig> {
    match WorkspaceConfig::discover() {
        Ok(discovered) => Some(discovered),
        Err(ConfigError::Missing { .. }) => None,
        Err(err) => {
            notifications.push(format!("workspace config unusable, coordination skipped: {err}"));
            None
        }
    }
}

async fn sync_issue_store(
    client: &BeadHubClient,
    discovered: &DiscoveredConfig,
    command_line: &[String],
    notifications: &mut Notifications,
) {
    let issues_path = beads_dir().join(ISSUES_FILE_NAME);
    let Ok(issues_path) = Utf8PathBuf::from_path_buf(issues_path) else {
        notifications.push("issue store path is not UTF-8, sync skipped".to_string());
        return;
    };
    let Ok(workspace_root) = Utf8PathBuf::from_path_buf(discovered.workspace_root.clone()) else {
        notifications.push("workspace root path is not UTF-8, sync skipped".to_string());
        return;
    };
    let state_path = sync_state_path(&workspace_root);

    let identity = WorkspaceIdentity {
        workspace_id: discovered.config.workspace_id.clone(),
        repo_id: discovered.config.repo_id.clone(),
        project_slug: discovered.config.project_slug.clone(),
    };

    match run_sync(client, &identity, &issues_path, &state_path, command_line).await {
        Ok(outcome) => match &outcome.plan {
            SyncPlan::Full { .. } => {
                let count = outcome
                    .issues_count
                    .map_or_else(String::new, |n| format!(" ({n} issues)"));
                notifications.push(format!("issue store synced{count}"));
            }
            SyncPlan::Incremental {
                changed_ids,
                deleted_ids,
                ..
            } => {
                notifications.push(format!(
                    "issue store synced ({} changed, {} deleted)",
                    changed_ids.len(),
                    deleted_ids.len()
                ));
            }
            SyncPlan::NoChanges => {}
        },
        Err(err) => {
            notifications.push(format!("sync failed, will retry on next command: {err}"));
        }
    }
}

pub(crate) fn api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
}

fn current_branch() -> Option<String> {
    let output = StdCommand::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!branch.is_empty()).then_some(branch)
}
