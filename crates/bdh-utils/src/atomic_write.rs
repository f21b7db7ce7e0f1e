//! Atomic file writes via a temporary file and rename.
//!
//! Readers of the sync watermark must never observe a half-written file. The
//! write goes to a `tempfile::NamedTempFile` in the target's own directory
//! (same filesystem, so the rename is atomic on the host), is fsynced, and
//! then persisted over the target. A failed write leaves the prior file
//! untouched and no temporary sibling behind.

use std::fs;
use std::io::Write;

use anyhow::{Context, Result};
use camino::Utf8Path;
use tempfile::NamedTempFile;

/// Atomically replace `path` with `content`.
///
/// Parent directories are created as needed. On success no temporary
/// sibling remains; on failure the previous contents of `path` are
/// unchanged.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory: {parent}"))?;
    }

    // The temp file lives in the target directory so the final rename never
    // crosses a filesystem boundary.
    let temp_dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("Failed to create temporary file in: {temp_dir}"))?;

    temp_file
        .write_all(content)
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path)
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn utf8_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    fn entry_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn writes_content_and_cleans_up_the_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = utf8_path(&dir, "state.json");

        write_file_atomic(&path, b"{\"k\":1}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{\"k\":1}");
        // Only the target remains; the temp sibling was renamed away.
        assert_eq!(entry_names(&dir), ["state.json"]);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = utf8_path(&dir, "nested/cache/state.json");

        write_file_atomic(&path, b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = utf8_path(&dir, "state.json");

        write_file_atomic(&path, b"old").unwrap();
        write_file_atomic(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(entry_names(&dir), ["state.json"]);
    }

    #[test]
    fn failure_preserves_the_existing_target() {
        let dir = TempDir::new().unwrap();
        let target = utf8_path(&dir, "state.json");

        // A directory squatting on the target makes the final rename fail.
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "prior").unwrap();

        assert!(write_file_atomic(&target, b"next").is_err());

        assert!(target.is_dir());
        assert_eq!(
            fs::read_to_string(target.join("keep")).unwrap(),
            "prior"
        );
        // The failed temp file was cleaned up on drop.
        assert_eq!(entry_names(&dir), ["state.json"]);
    }

    #[test]
    fn empty_content_is_written() {
        let dir = TempDir::new().unwrap();
        let path = utf8_path(&dir, "empty.json");

        write_file_atomic(&path, b"").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");
    }
}
