//! Wrapper-owned commands: human-facing views over the coordination API.
//!
//! These require a workspace; a missing or invalid `.beadhub` is fatal here,
//! unlike the pass-through path.

use anyhow::{Context, Result};

use bdh_client::api::WorkspaceQuery;
use bdh_client::BeadHubClient;
use bdh_config::WorkspaceConfig;

use crate::invoke::api_key;

fn connect() -> Result<(bdh_config::DiscoveredConfig, BeadHubClient)> {
    let discovered = WorkspaceConfig::discover().context("this command needs a workspace")?;
    let client = BeadHubClient::new(&discovered.config.beadhub_url, api_key())
        .context("failed to build BeadHub client")?;
    Ok((discovered, client))
}

/// `bdh status`: one line about the server.
pub async fn status() -> Result<i32> {
    let (discovered, client) = connect()?;
    let status = client.status().await?;

    let version = status
        .version
        .map_or_else(String::new, |v| format!(" (version {v})"));
    println!(
        "{}: {}{}",
        discovered.config.beadhub_url,
        if status.status.is_empty() { "ok" } else { &status.status },
        version
    );
    Ok(0)
}

/// `bdh workspaces`: the project's workspaces, one per line.
pub async fn workspaces(include_inactive: bool) -> Result<i32> {
    let (discovered, client) = connect()?;
    let query = WorkspaceQuery {
        project_slug: Some(discovered.config.project_slug.clone()),
        include_inactive: include_inactive.then_some(true),
    };
    let response = client.list_workspaces(&query).await?;

    if response.workspaces.is_empty() {
        println!("no workspaces registered");
        return Ok(0);
    }

    for workspace in &response.workspaces {
        let role = workspace.role.as_deref().unwrap_or("-");
        let last_seen = workspace.last_seen.as_deref().unwrap_or("never");
        let marker = if workspace.workspace_id == discovered.config.workspace_id {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<16} {:<24} {:<14} last seen {last_seen}",
            workspace.alias, workspace.human_name, role
        );
    }
    Ok(0)
}
