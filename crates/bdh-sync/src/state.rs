//! Persistent sync watermark.
//!
//! Lives at `<workspace_root>/.beadhub-cache/sync-state.json` and may be
//! deleted at any time; a missing or corrupt file simply forces the next
//! sync to be a full one. Concurrent writers across processes are tolerated
//! as last-writer-wins: the next sync recovers by re-diffing.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use bdh_utils::atomic_write::write_file_atomic;

/// Protocol version this client speaks on `/v1/bdh/sync`.
pub const SYNC_PROTOCOL_VERSION: i64 = 1;

/// Directory under the workspace root holding bdh's persisted state.
pub const CACHE_DIR_NAME: &str = ".beadhub-cache";

/// Watermark file name inside [`CACHE_DIR_NAME`].
pub const STATE_FILE_NAME: &str = "sync-state.json";

/// The sync watermark: the basis the next incremental diff runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_sync: DateTime<Utc>,
    pub protocol_version: i64,
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub issue_hashes: BTreeMap<String, String>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            last_sync: DateTime::UNIX_EPOCH,
            protocol_version: SYNC_PROTOCOL_VERSION,
            issue_hashes: BTreeMap::new(),
        }
    }
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<BTreeMap<String, String>>::deserialize(deserializer)?;
    Ok(map.unwrap_or_default())
}

impl SyncState {
    /// Load the watermark. Absent or unreadable state is never an error:
    /// it degrades to an empty watermark, which forces a full sync.
    pub fn load(path: &Utf8Path) -> Self {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_slice(&raw) {
            Ok(state) => state,
            Err(err) => {
                debug!(%path, error = %err, "sync state unreadable, starting fresh");
                Self::default()
            }
        }
    }

    /// Atomically persist the watermark, creating parent directories.
    pub fn save(&self, path: &Utf8Path) -> anyhow::Result<()> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        write_file_atomic(path, &json)
    }

    /// Whether the next sync must upload the whole store.
    ///
    /// True for an empty watermark, a protocol change, and hashes recorded
    /// under an older hash version: cross-version hashes never compare
    /// equal, so re-basing on a full upload beats diffing garbage.
    #[must_use]
    pub fn needs_full_sync(&self) -> bool {
        let prefix = format!("{}:", bdh_hash::HASH_VERSION);
        self.issue_hashes.is_empty()
            || self.protocol_version != SYNC_PROTOCOL_VERSION
            || self.issue_hashes.values().any(|hash| !hash.starts_with(&prefix))
    }

    /// Advance the watermark to `current_hashes` as of now.
    pub fn update(&mut self, current_hashes: BTreeMap<String, String>) {
        self.last_sync = Utc::now();
        self.protocol_version = SYNC_PROTOCOL_VERSION;
        self.issue_hashes = current_hashes;
    }
}

/// Watermark location for a workspace root (the directory holding
/// `.beadhub`, not the issue store's directory).
#[must_use]
pub fn sync_state_path(workspace_root: &Utf8Path) -> Utf8PathBuf {
    workspace_root.join(CACHE_DIR_NAME).join(STATE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state_path(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("sync-state.json")).unwrap()
    }

    #[test]
    fn missing_file_loads_as_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = SyncState::load(&state_path(&dir));
        assert!(state.issue_hashes.is_empty());
        assert!(state.needs_full_sync());
        assert_eq!(state.last_sync, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn corrupt_file_loads_as_empty_state() {
        let dir = TempDir::new().unwrap();
        let path = state_path(&dir);
        fs::write(&path, b"{definitely not json").unwrap();
        assert!(SyncState::load(&path).needs_full_sync());
    }

    #[test]
    fn null_issue_hashes_becomes_empty_map() {
        let dir = TempDir::new().unwrap();
        let path = state_path(&dir);
        fs::write(
            &path,
            br#"{"last_sync":"2026-01-01T00:00:00Z","protocol_version":1,"issue_hashes":null}"#,
        )
        .unwrap();
        let state = SyncState::load(&path);
        assert!(state.issue_hashes.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = state_path(&dir);

        let mut state = SyncState::default();
        state.update(BTreeMap::from([
            ("bd-1".to_string(), "v1:aa".to_string()),
            ("bd-2".to_string(), "v1:bb".to_string()),
        ]));
        state.save(&path).unwrap();

        let loaded = SyncState::load(&path);
        assert_eq!(loaded, state);
        assert!(!loaded.needs_full_sync());
        assert!(loaded.last_sync > DateTime::UNIX_EPOCH);
    }

    #[test]
    fn save_leaves_no_temporary_sibling() {
        let dir = TempDir::new().unwrap();
        let path = state_path(&dir);
        SyncState::default().save(&path).unwrap();

        assert!(path.exists());
        let entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, ["sync-state.json"]);
    }

    #[test]
    fn save_creates_the_cache_directory() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = sync_state_path(&root);
        assert!(path.as_str().contains(".beadhub-cache"));

        SyncState::default().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn stale_protocol_version_forces_full_sync() {
        let mut state = SyncState::default();
        state.update(BTreeMap::from([("bd-1".to_string(), "v1:aa".to_string())]));
        assert!(!state.needs_full_sync());

        state.protocol_version = SYNC_PROTOCOL_VERSION + 1;
        assert!(state.needs_full_sync());
    }

    #[test]
    fn hashes_from_an_older_hash_version_force_full_sync() {
        let mut state = SyncState::default();
        state.update(BTreeMap::from([("bd-1".to_string(), "v0:aa".to_string())]));
        assert!(state.needs_full_sync());
    }
}
