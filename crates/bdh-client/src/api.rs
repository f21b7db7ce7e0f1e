//! Typed request/response pairs for every BeadHub endpoint.
//!
//! Requests serialize only the fields the endpoint recognizes; optional
//! fields are omitted entirely rather than sent as null. Responses default
//! every field so unknown or missing server fields never break decoding
//! (forward compatibility is the server's prerogative).

use reqwest::Method;
use reqwest::header::{IF_MODIFIED_SINCE, IF_NONE_MATCH};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::status_error;
use crate::{ApiError, BeadHubClient};

// ── Pre-flight ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    pub alias: String,
    pub human_name: String,
    pub repo_origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub command_line: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

// ── Sync ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SyncRequest {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    pub project_slug: String,
    pub sync_protocol_version: i64,
    /// Omitted for a full sync; `"incremental"` otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_jsonl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_issues: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncResponse {
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub issues_count: Option<i64>,
    #[serde(default)]
    pub stats: Option<Value>,
    #[serde(default)]
    pub sync_protocol_version: Option<i64>,
}

// ── Projects, repos, init ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EnsureProjectRequest {
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsureRepoRequest {
    pub project_slug: String,
    pub canonical_origin: String,
    pub repo_origin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupRepoRequest {
    pub canonical_origin: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub canonical_origin: String,
    #[serde(default)]
    pub project_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitRequest {
    pub project_slug: String,
    pub canonical_origin: String,
    pub repo_origin: String,
    pub alias: String,
    pub human_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitResponse {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub repo_id: Option<String>,
    #[serde(default)]
    pub project_slug: String,
}

// ── Presence ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AgentRegisterRequest {
    pub workspace_id: String,
    pub alias: String,
    pub human_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentRegisterResponse {
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub expires_at: Option<String>,
}

// ── Workspaces ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkspaceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub human_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspacesResponse {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceInfo>,
}

// ── Messaging ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct InboxQuery {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_acked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from_alias: Option<String>,
    #[serde(default)]
    pub to_alias: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub acked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxResponse {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub workspace_id: String,
    pub to_alias: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub acked: bool,
}

// ── Chat ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CreateChatSessionRequest {
    pub workspace_id: String,
    pub participants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostChatMessageRequest {
    pub workspace_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub from_alias: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReadRequest {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatPendingQuery {
    pub workspace_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatPendingSession {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub unread_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatPendingResponse {
    #[serde(default)]
    pub sessions: Vec<ChatPendingSession>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatHistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessagesResponse {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSessionsQuery {
    pub workspace_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatSessionsResponse {
    #[serde(default)]
    pub sessions: Vec<ChatSession>,
}

// ── Reservations ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ReservationRequest {
    pub workspace_id: String,
    pub issue_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationConflict {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub held_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationResponse {
    #[serde(default)]
    pub reserved: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<ReservationConflict>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReservationRequest {
    pub workspace_id: String,
    pub issue_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReleaseReservationResponse {
    #[serde(default)]
    pub released: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReservationsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationInfo {
    #[serde(default)]
    pub issue_id: String,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationsResponse {
    #[serde(default)]
    pub reservations: Vec<ReservationInfo>,
}

// ── Policy ──────────────────────────────────────────────────────────

/// Result of a conditional policy fetch. On 304 only the metadata is set;
/// callers keep their cached body.
#[derive(Debug, Clone)]
pub struct PolicyFetch {
    pub status_code: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub body: Option<Value>,
}

// ── Escalation, status ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct EscalationRequest {
    pub workspace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EscalationResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
}

// ── Endpoint methods ────────────────────────────────────────────────

impl BeadHubClient {
    /// Pre-flight approval for a mutating tracker command.
    pub async fn preflight_command(
        &self,
        request: &CommandRequest,
    ) -> Result<CommandResponse, ApiError> {
        self.post_json(&["v1", "bdh", "command"], request).await
    }

    /// Upload a full or incremental issue snapshot.
    pub async fn sync_issues(&self, request: &SyncRequest) -> Result<SyncResponse, ApiError> {
        self.post_json(&["v1", "bdh", "sync"], request).await
    }

    pub async fn ensure_project(
        &self,
        request: &EnsureProjectRequest,
    ) -> Result<ProjectInfo, ApiError> {
        self.post_json(&["v1", "projects", "ensure"], request).await
    }

    pub async fn ensure_repo(&self, request: &EnsureRepoRequest) -> Result<RepoInfo, ApiError> {
        self.post_json(&["v1", "repos", "ensure"], request).await
    }

    /// Look up a repo by canonical origin; 404 means "not present".
    pub async fn lookup_repo(
        &self,
        request: &LookupRepoRequest,
    ) -> Result<Option<RepoInfo>, ApiError> {
        match self.post_json(&["v1", "repos", "lookup"], request).await {
            Ok(info) => Ok(Some(info)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn init_workspace(&self, request: &InitRequest) -> Result<InitResponse, ApiError> {
        self.post_json(&["v1", "init"], request).await
    }

    /// Presence heartbeat.
    pub async fn register_agent(
        &self,
        request: &AgentRegisterRequest,
    ) -> Result<AgentRegisterResponse, ApiError> {
        self.post_json(&["v1", "agents", "register"], request).await
    }

    pub async fn list_workspaces(
        &self,
        query: &WorkspaceQuery,
    ) -> Result<WorkspacesResponse, ApiError> {
        self.get_json(&["v1", "workspaces"], Some(query)).await
    }

    pub async fn team_workspaces(
        &self,
        query: &WorkspaceQuery,
    ) -> Result<WorkspacesResponse, ApiError> {
        self.get_json(&["v1", "workspaces", "team"], Some(query)).await
    }

    /// Remove a workspace; 404 means it was already gone.
    pub async fn delete_workspace(&self, workspace_id: &str) -> Result<Option<()>, ApiError> {
        self.delete(&["v1", "workspaces", workspace_id]).await
    }

    pub async fn inbox(&self, query: &InboxQuery) -> Result<InboxResponse, ApiError> {
        self.get_json(&["v1", "messages", "inbox"], Some(query)).await
    }

    pub async fn send_message(&self, request: &SendMessageRequest) -> Result<Message, ApiError> {
        self.post_json(&["v1", "messages"], request).await
    }

    pub async fn ack_message(&self, message_id: &str) -> Result<AckResponse, ApiError> {
        self.post_json(&["v1", "messages", message_id, "ack"], &serde_json::json!({}))
            .await
    }

    pub async fn create_chat_session(
        &self,
        request: &CreateChatSessionRequest,
    ) -> Result<ChatSession, ApiError> {
        self.post_json(&["v1", "chat", "sessions"], request).await
    }

    pub async fn post_chat_message(
        &self,
        session_id: &str,
        request: &PostChatMessageRequest,
    ) -> Result<ChatMessage, ApiError> {
        self.post_json(&["v1", "chat", "sessions", session_id, "messages"], request)
            .await
    }

    pub async fn mark_chat_read(
        &self,
        session_id: &str,
        request: &ChatReadRequest,
    ) -> Result<(), ApiError> {
        let _: Value = self
            .post_json(&["v1", "chat", "sessions", session_id, "read"], request)
            .await?;
        Ok(())
    }

    pub async fn pending_chats(
        &self,
        query: &ChatPendingQuery,
    ) -> Result<ChatPendingResponse, ApiError> {
        self.get_json(&["v1", "chat", "pending"], Some(query)).await
    }

    pub async fn chat_messages(
        &self,
        session_id: &str,
        query: &ChatHistoryQuery,
    ) -> Result<ChatMessagesResponse, ApiError> {
        self.get_json(&["v1", "chat", "sessions", session_id, "messages"], Some(query))
            .await
    }

    pub async fn chat_sessions(
        &self,
        query: &ChatSessionsQuery,
    ) -> Result<ChatSessionsResponse, ApiError> {
        self.get_json(&["v1", "chat", "sessions"], Some(query)).await
    }

    pub async fn reserve_issues(
        &self,
        request: &ReservationRequest,
    ) -> Result<ReservationResponse, ApiError> {
        self.post_json(&["v1", "reservations"], request).await
    }

    pub async fn release_reservations(
        &self,
        request: &ReleaseReservationRequest,
    ) -> Result<ReleaseReservationResponse, ApiError> {
        self.post_json(&["v1", "reservations", "release"], request).await
    }

    pub async fn list_reservations(
        &self,
        query: &ReservationsQuery,
    ) -> Result<ReservationsResponse, ApiError> {
        self.get_json(&["v1", "reservations"], Some(query)).await
    }

    /// Fetch the active policy document unconditionally.
    pub async fn active_policy(&self) -> Result<Value, ApiError> {
        self.get_json(&["v1", "policies", "active"], None::<&()>).await
    }

    /// Conditional fetch of the active policy. Sends `If-None-Match` /
    /// `If-Modified-Since` when provided; a 304 yields metadata only.
    pub async fn active_policy_conditional(
        &self,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<PolicyFetch, ApiError> {
        let url = self.endpoint(&["v1", "policies", "active"])?;
        let mut builder = self.request(Method::GET, url);
        if let Some(etag) = etag {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = last_modified {
            builder = builder.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = builder.send().await.map_err(ApiError::from_reqwest)?;
        let status = response.status();
        let etag = header_string(&response, reqwest::header::ETAG);
        let last_modified = header_string(&response, reqwest::header::LAST_MODIFIED);

        if status.as_u16() == 304 {
            return Ok(PolicyFetch {
                status_code: 304,
                etag,
                last_modified,
                body: None,
            });
        }

        let body = crate::http::collect_capped(response.bytes_stream(), self.response_cap())
            .await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        Ok(PolicyFetch {
            status_code: status.as_u16(),
            etag,
            last_modified,
            body: Some(serde_json::from_slice(&body)?),
        })
    }

    pub async fn reset_policy(&self) -> Result<Value, ApiError> {
        self.post_json(&["v1", "policies", "reset"], &serde_json::json!({}))
            .await
    }

    pub async fn escalate(&self, request: &EscalationRequest) -> Result<EscalationResponse, ApiError> {
        self.post_json(&["v1", "escalations"], request).await
    }

    pub async fn status(&self) -> Result<ServerStatus, ApiError> {
        self.get_json(&["v1", "status"], None::<&()>).await
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_omits_absent_fields() {
        let request = SyncRequest {
            workspace_id: "w".into(),
            repo_id: None,
            project_slug: "p".into(),
            sync_protocol_version: 1,
            sync_mode: None,
            issues_jsonl: Some("{}".into()),
            changed_issues: None,
            deleted_ids: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["issues_jsonl", "project_slug", "sync_protocol_version", "workspace_id"]
        );
    }

    #[test]
    fn responses_tolerate_unknown_and_missing_fields() {
        let response: SyncResponse = serde_json::from_str(
            r#"{"synced":true,"issues_count":3,"brand_new_field":{"x":1}}"#,
        )
        .unwrap();
        assert!(response.synced);
        assert_eq!(response.issues_count, Some(3));
        assert_eq!(response.sync_protocol_version, None);

        let response: CommandResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.approved);
        assert!(response.reason.is_none());
    }

    #[test]
    fn workspace_query_serializes_only_set_fields() {
        let query = WorkspaceQuery {
            project_slug: Some("widgets".into()),
            include_inactive: None,
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"project_slug": "widgets"}));
    }
}
