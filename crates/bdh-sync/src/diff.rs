//! Hash-map diffing between the live store and the watermark.
//!
//! Output order is deterministic (lexicographic) so test assertions and
//! server-side logs are stable across runs.

use std::collections::BTreeMap;

/// Ids present in `current` whose hash differs from `last`, or which `last`
/// has never seen. New issues are changed issues by construction.
#[must_use]
pub fn find_changed(
    current: &BTreeMap<String, String>,
    last: &BTreeMap<String, String>,
) -> Vec<String> {
    current
        .iter()
        .filter(|(id, hash)| last.get(*id) != Some(hash))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Ids the watermark knows that the live store no longer contains.
#[must_use]
pub fn find_deleted(
    current: &BTreeMap<String, String>,
    last: &BTreeMap<String, String>,
) -> Vec<String> {
    last.keys()
        .filter(|id| !current.contains_key(*id))
        .cloned()
        .collect()
}
