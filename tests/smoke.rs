//! End-to-end smoke tests over the wrapper's building blocks, using the
//! same literal inputs a first deployment would see.

use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use bdh_client::sse::SseParser;
use bdh_gate::{classify_subcommand, is_mutating};
use bdh_hash::hash_issue;
use bdh_sync::orchestrator::build_request;
use bdh_sync::{SYNC_PROTOCOL_VERSION, SyncPlan, SyncState, WorkspaceIdentity, compute_hashes, plan_sync};

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn hash_is_stable_across_key_order() {
    let a = hash_issue(br#"{"id":"bd-1","status":"open","title":"T"}"#).unwrap();
    let b = hash_issue(br#"{"title":"T","id":"bd-1","status":"open"}"#).unwrap();

    assert_eq!(a.id, "bd-1");
    assert_eq!(a.hash, b.hash);
    assert!(a.hash.starts_with("v1:"));
}

#[test]
fn incremental_diff_reports_modified_and_new() {
    let current = BTreeMap::from([
        ("bd-1".to_string(), "h1".to_string()),
        ("bd-2".to_string(), "h2'".to_string()),
        ("bd-3".to_string(), "h3".to_string()),
    ]);
    let last = BTreeMap::from([
        ("bd-1".to_string(), "h1".to_string()),
        ("bd-2".to_string(), "h2".to_string()),
    ]);

    assert_eq!(bdh_sync::find_changed(&current, &last), ["bd-2", "bd-3"]);
    assert!(bdh_sync::find_deleted(&current, &last).is_empty());
}

#[test]
fn deletions_are_detected() {
    let current = BTreeMap::from([("bd-1".to_string(), "h1".to_string())]);
    let last = BTreeMap::from([
        ("bd-1".to_string(), "h1".to_string()),
        ("bd-2".to_string(), "h2".to_string()),
        ("bd-3".to_string(), "h3".to_string()),
    ]);

    assert!(bdh_sync::find_changed(&current, &last).is_empty());
    assert_eq!(bdh_sync::find_deleted(&current, &last), ["bd-2", "bd-3"]);
}

#[test]
fn mutation_classifier_handles_global_flags() {
    assert!(is_mutating(&args(&[
        "--db",
        ".beads/beads.db",
        "dep",
        "add",
        "bd-43",
        "bd-42"
    ])));
    assert!(!is_mutating(&args(&["list"])));
    // --db consumes the next token even when it looks like a flag.
    assert!(is_mutating(&args(&["--db", "--no-daemon", "create"])));
    assert_eq!(
        classify_subcommand(&args(&["--db", "--no-daemon", "create"])),
        Some("create")
    );
}

#[test]
fn first_sync_uploads_the_whole_store_then_goes_incremental() {
    let store: &[u8] = b"{\"id\":\"bd-1\",\"title\":\"one\"}\n{\"id\":\"bd-2\",\"title\":\"two\"}\n{\"id\":\"bd-3\",\"title\":\"three\"}\n";
    let identity = WorkspaceIdentity {
        workspace_id: "01234567-89ab-4cde-8f01-23456789abcd".to_string(),
        repo_id: None,
        project_slug: "widgets".to_string(),
    };

    let dir = TempDir::new().unwrap();
    let state_path = Utf8PathBuf::from_path_buf(dir.path().join("sync-state.json")).unwrap();

    // Empty watermark: the plan is a full upload with no sync_mode.
    let mut state = SyncState::load(&state_path);
    assert!(state.needs_full_sync());
    let current = compute_hashes(store).unwrap();
    let plan = plan_sync(&state, &current, store);
    let request = build_request(&identity, &plan).unwrap();
    assert!(request.sync_mode.is_none());
    assert_eq!(request.issues_jsonl.as_deref(), Some(std::str::from_utf8(store).unwrap()));
    assert_eq!(request.sync_protocol_version, SYNC_PROTOCOL_VERSION);

    // Server acknowledged: the watermark commits all three hashes.
    state.update(current.clone());
    state.save(&state_path).unwrap();

    let reloaded = SyncState::load(&state_path);
    assert!(!reloaded.needs_full_sync());
    assert_eq!(reloaded.issue_hashes.len(), 3);
    assert!(reloaded.last_sync > chrono::DateTime::UNIX_EPOCH);

    // Nothing changed since: no RPC, just a watermark refresh.
    assert_eq!(plan_sync(&reloaded, &current, store), SyncPlan::NoChanges);
}

#[test]
fn sse_stream_recovers_after_an_oversized_event() {
    let mut parser = SseParser::new();

    // A 1.5 MiB event, then a small well-formed one.
    let big_line = format!("data: {}\n", "x".repeat(24 * 1024));
    let mut stream = String::from("event: oversized\n");
    for _ in 0..64 {
        stream.push_str(&big_line);
    }
    stream.push('\n');
    stream.push_str("event: recovered\ndata: success\n\n");

    let events = parser.push(stream.as_bytes()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "recovered");
    assert_eq!(events[0].data, "success");
}

#[test]
fn sse_multiline_data_joins() {
    let mut parser = SseParser::new();
    let events = parser.push(b"data: a\ndata: b\n\n").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, "a\nb");
}
