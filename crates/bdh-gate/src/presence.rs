//! Fire-and-forget presence heartbeat.

use bdh_client::api::AgentRegisterRequest;
use bdh_client::BeadHubClient;
use bdh_config::WorkspaceConfig;
use tracing::debug;

use crate::Notifications;

/// How long a heartbeat keeps this workspace listed as present.
pub const PRESENCE_TTL_SECS: u64 = 600;

/// Optional environment details attached to a heartbeat.
#[derive(Debug, Clone, Default)]
pub struct PresenceContext {
    pub program: Option<String>,
    pub model: Option<String>,
    pub branch: Option<String>,
}

/// Refresh this workspace's presence. Failure is non-fatal and ends up as a
/// deferred notification; the heartbeat is still bounded by the client's
/// request timeout.
pub async fn refresh_presence(
    client: &BeadHubClient,
    config: &WorkspaceConfig,
    context: &PresenceContext,
    notifications: &mut Notifications,
) {
    let request = AgentRegisterRequest {
        workspace_id: config.workspace_id.clone(),
        alias: config.alias.clone(),
        human_name: config.human_name.clone(),
        role: config.role.clone(),
        host: std::env::var("HOSTNAME").ok(),
        path: std::env::current_dir()
            .ok()
            .map(|p| p.display().to_string()),
        program: context.program.clone(),
        model: context.model.clone(),
        branch: context.branch.clone(),
        ttl_seconds: PRESENCE_TTL_SECS,
    };

    match client.register_agent(&request).await {
        Ok(response) => {
            debug!(expires_at = ?response.expires_at, "presence refreshed");
        }
        Err(err) => {
            notifications.push(format!("presence refresh failed: {err}"));
        }
    }
}
