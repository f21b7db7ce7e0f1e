//! JSON-Lines codec for the bd issue store.
//!
//! The store is owned by the tracker binary; this crate only reads it. Lines
//! may end in LF or CRLF and blank lines are legal. Syntax validation is the
//! hashing pass's job, so the extraction helpers here skip unparseable lines
//! silently instead of failing mid-sync.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

/// A JSONL line that failed to parse, with 1-based line context.
#[derive(Debug, Error)]
#[error("invalid JSON on line {line}: {source}")]
pub struct LineError {
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Split raw store bytes into logical lines.
///
/// Splits on `\n`, strips one trailing `\r` per line, and drops empty lines.
pub fn split(bytes: &[u8]) -> Vec<&[u8]> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Collect the lines whose `id` is in `ids`, LF-joined without a trailing
/// newline. Unparseable lines and lines without a string `id` are skipped.
pub fn extract_by_id(bytes: &[u8], ids: &HashSet<String>) -> String {
    let mut out = String::new();
    for line in split(bytes) {
        let Ok(value) = serde_json::from_slice::<Value>(line) else {
            continue;
        };
        let Some(id) = value.get("id").and_then(Value::as_str) else {
            continue;
        };
        if ids.contains(id) {
            if !out.is_empty() {
                out.push('\n');
            }
            // split() only yields slices of the input, which the tracker
            // writes as UTF-8; a lossy conversion keeps this total.
            out.push_str(&String::from_utf8_lossy(line));
        }
    }
    out
}

/// All non-empty `id` values in file order, duplicates preserved.
pub fn enumerate_ids(bytes: &[u8]) -> Vec<String> {
    split(bytes)
        .into_iter()
        .filter_map(|line| serde_json::from_slice::<Value>(line).ok())
        .filter_map(|value| {
            value
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Parse every line, surfacing the first syntax error with line context.
///
/// Used by hashing passes, where a corrupt store must stop the sync.
pub fn parse_all(bytes: &[u8]) -> Result<Vec<(usize, Value)>, LineError> {
    let mut values = Vec::new();
    let mut line_no = 0usize;
    for raw in bytes.split(|&b| b == b'\n') {
        line_no += 1;
        let line = raw.strip_suffix(b"\r").unwrap_or(raw);
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_slice(line).map_err(|source| LineError {
            line: line_no,
            source,
        })?;
        values.push((line_no, value));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tolerates_crlf_and_blank_lines() {
        let bytes = b"{\"id\":\"a\"}\r\n\n{\"id\":\"b\"}\n\r\n{\"id\":\"c\"}";
        let lines = split(bytes);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], br#"{"id":"a"}"#);
        assert_eq!(lines[2], br#"{"id":"c"}"#);
    }

    #[test]
    fn extract_joins_with_lf_and_no_trailing_newline() {
        let bytes = b"{\"id\":\"a\",\"n\":1}\n{\"id\":\"b\",\"n\":2}\n{\"id\":\"c\",\"n\":3}\n";
        let ids: HashSet<String> = ["a", "c"].into_iter().map(str::to_string).collect();

        let extracted = extract_by_id(bytes, &ids);
        assert_eq!(extracted, "{\"id\":\"a\",\"n\":1}\n{\"id\":\"c\",\"n\":3}");
    }

    #[test]
    fn extract_skips_unparseable_lines() {
        let bytes = b"{\"id\":\"a\"}\nnot json\n{\"id\":\"b\"}\n";
        let ids: HashSet<String> = ["a", "b"].into_iter().map(str::to_string).collect();

        assert_eq!(extract_by_id(bytes, &ids), "{\"id\":\"a\"}\n{\"id\":\"b\"}");
    }

    #[test]
    fn extract_of_nothing_is_empty() {
        let ids = HashSet::new();
        assert_eq!(extract_by_id(b"{\"id\":\"a\"}\n", &ids), "");
    }

    #[test]
    fn enumerate_preserves_order_and_duplicates() {
        let bytes = b"{\"id\":\"b\"}\n{\"id\":\"a\"}\n{\"id\":\"b\"}\n{\"title\":\"x\"}\n{\"id\":\"\"}\n";
        assert_eq!(enumerate_ids(bytes), ["b", "a", "b"]);
    }

    #[test]
    fn parse_all_reports_line_numbers() {
        let bytes = b"{\"id\":\"a\"}\n\n{oops\n";
        let err = parse_all(bytes).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn parse_all_counts_blank_lines_in_context() {
        let bytes = b"\r\n{\"id\":\"a\"}\r\n";
        let parsed = parse_all(bytes).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].0, 2);
    }
}
