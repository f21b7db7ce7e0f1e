//! Pre-flight approval for mutating tracker commands.

use bdh_client::api::CommandRequest;
use bdh_client::BeadHubClient;
use bdh_config::WorkspaceConfig;
use tracing::debug;

use crate::Notifications;

/// What the gate learned before the tracker ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightOutcome {
    /// Server approved, or no gating was needed.
    Approved,
    /// Server advised against running. The tracker still runs; without an
    /// override the wrapper's exit becomes non-zero afterwards.
    Rejected { reason: String },
    /// Server could not be reached; coordination is skipped this run.
    Unavailable,
}

/// Advertise a command to the server and collect its advice.
///
/// Never blocks the tracker: rejection and unreachability both degrade to
/// notifications.
pub async fn preflight(
    client: &BeadHubClient,
    config: &WorkspaceConfig,
    command_line: &[String],
    notifications: &mut Notifications,
) -> PreflightOutcome {
    let request = CommandRequest {
        workspace_id: config.workspace_id.clone(),
        repo_id: config.repo_id.clone(),
        alias: config.alias.clone(),
        human_name: config.human_name.clone(),
        repo_origin: config.repo_origin.clone(),
        role: config.role.clone(),
        command_line: command_line.to_vec(),
    };

    match client.preflight_command(&request).await {
        Ok(response) if response.approved => {
            debug!("pre-flight approved");
            PreflightOutcome::Approved
        }
        Ok(response) => {
            let reason = response
                .reason
                .unwrap_or_else(|| "no reason given".to_string());
            notifications.push(format!("pre-flight: server advised against this command: {reason}"));
            if let Some(context) = response.context {
                notifications.push(format!("pre-flight context: {context}"));
            }
            PreflightOutcome::Rejected { reason }
        }
        Err(err) => {
            notifications.push(format!(
                "beadhub unreachable, running without coordination: {err}"
            ));
            PreflightOutcome::Unavailable
        }
    }
}
