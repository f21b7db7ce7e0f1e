//! Canonical content hashing for bd issues.
//!
//! An issue's hash must be a pure function of its JSON *value*: two lines that
//! differ only in key order, `\uXXXX` escapes, or insignificant whitespace
//! hash identically. The canonical form re-emits the parsed tree with object
//! keys sorted ascending by Unicode code point at every depth; arrays keep
//! their order; scalars are re-emitted by `serde_json`.

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Version tag prefixed to every hash.
///
/// Any change to the canonical form must bump this constant. A watermark
/// recorded under a different version never compares equal to a fresh hash,
/// which forces the next sync to be a full one.
pub const HASH_VERSION: &str = "v1";

/// Per-issue hashing result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueHash {
    /// The issue's `id` field, or `""` when absent, empty, or not a string.
    pub id: String,
    /// `"v1:<hex sha256>"`, or `""` when the line has no usable id.
    pub hash: String,
}

/// Errors from the hashing pass.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid issue JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Hash one JSONL line holding a single issue object.
///
/// Lines without a string `id` (or with an empty one) are skipped for
/// hashing: the result carries empty `id` and `hash` and no error. Malformed
/// JSON is a hard error; sync passes must not proceed over a corrupt store.
pub fn hash_issue(line: &[u8]) -> Result<IssueHash, HashError> {
    let value: Value = serde_json::from_slice(line)?;

    let id = match value.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Ok(IssueHash {
                id: String::new(),
                hash: String::new(),
            });
        }
    };

    Ok(IssueHash {
        id,
        hash: hash_value(&value)?,
    })
}

/// Hash an already-parsed JSON value under the current [`HASH_VERSION`].
pub fn hash_value(value: &Value) -> Result<String, HashError> {
    let canonical = canonical_json(value)?;
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{HASH_VERSION}:{:x}", hasher.finalize()))
}

/// Emit the canonical byte encoding of a JSON value.
///
/// Objects are rewritten with keys sorted ascending by code point at every
/// depth; array order is significant and preserved.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>, HashError> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), HashError> {
    match value {
        Value::Object(map) => {
            out.push(b'{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}
