//! Incremental sync engine for the bd issue store.
//!
//! The watermark records the per-issue hashes acknowledged by the server.
//! Each sync recomputes hashes from the live store, diffs against the
//! watermark, and uploads either the whole file or just the delta. The
//! watermark only moves after the server confirms, so a failed upload leaves
//! the next invocation to re-diff from the same basis.

pub mod diff;
pub mod orchestrator;
pub mod state;

pub use diff::{find_changed, find_deleted};
pub use orchestrator::{SyncOutcome, SyncPlan, WorkspaceIdentity, compute_hashes, plan_sync, run_sync};
pub use state::{SYNC_PROTOCOL_VERSION, SyncState, sync_state_path};

use thiserror::Error;

/// Errors from a sync attempt. None of these move the watermark.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read issue store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("issue store is not valid JSONL: {0}")]
    InvalidStore(#[from] bdh_jsonl::LineError),

    #[error(transparent)]
    Hash(#[from] bdh_hash::HashError),

    #[error(transparent)]
    Api(#[from] bdh_client::ApiError),

    #[error("server did not acknowledge the sync")]
    NotAcknowledged,

    #[error("failed to persist sync state: {0}")]
    State(#[from] anyhow::Error),
}
