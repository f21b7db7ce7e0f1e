//! Worktree-aware location of the bd issue store.
//!
//! The tracker keeps its database and `issues.jsonl` under `.beads/` in the
//! *main* repository root. Inside a linked worktree, `git rev-parse
//! --git-common-dir` still points at the main repo's `.git`, so its parent is
//! the root every worktree shares. The first resolution is cached for the
//! process; tests use [`resolve_beads_dir_from`] or [`reset_store_cache`] to
//! stay isolated.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

/// Errors from git-based store discovery.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("`git rev-parse --git-common-dir` failed (exit code {exit_code:?}): {stderr}")]
    GitCommand {
        stderr: String,
        exit_code: Option<i32>,
    },
}

static BEADS_DIR: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

/// Resolve the `.beads` directory for the current process, cached after the
/// first call.
///
/// When git detection fails a one-line hint goes to stderr and the relative
/// `./.beads` fallback is used, so the tracker subprocess still runs.
pub fn beads_dir() -> PathBuf {
    let mut cached = BEADS_DIR.lock().unwrap_or_else(|poison| poison.into_inner());
    if let Some(dir) = cached.as_ref() {
        return dir.clone();
    }

    let dir = match std::env::current_dir() {
        Ok(cwd) => resolve_beads_dir_from(&cwd),
        Err(e) => {
            eprintln!("bdh: git detection failed: {e} (using fallback .beads)");
            PathBuf::from(".beads")
        }
    };
    *cached = Some(dir.clone());
    dir
}

/// Drop the cached resolution. Test isolation hook.
pub fn reset_store_cache() {
    let mut cached = BEADS_DIR.lock().unwrap_or_else(|poison| poison.into_inner());
    *cached = None;
}

/// Uncached path-driven resolution, starting git discovery from `dir`.
pub fn resolve_beads_dir_from(dir: &Path) -> PathBuf {
    match main_repo_root(dir) {
        Ok(root) => {
            let beads = root.join(".beads");
            if beads.is_dir() {
                debug!(path = %beads.display(), "resolved issue store from main repo root");
                beads
            } else {
                PathBuf::from(".beads")
            }
        }
        Err(e) => {
            eprintln!("bdh: git detection failed: {e} (using fallback .beads)");
            PathBuf::from(".beads")
        }
    }
}

/// The main repository root: parent of the symlink-resolved common git dir.
pub fn main_repo_root(dir: &Path) -> Result<PathBuf, GitError> {
    let common = git_common_dir(dir)?;
    Ok(common
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| common.clone()))
}

fn git_common_dir(dir: &Path) -> Result<PathBuf, GitError> {
    let output = Command::new("git")
        .args(["rev-parse", "--git-common-dir"])
        .current_dir(dir)
        .output()?;

    if !output.status.success() {
        return Err(GitError::GitCommand {
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        });
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut path = PathBuf::from(raw.trim());
    if path.is_relative() {
        path = dir.join(path);
    }
    // Canonicalize so a symlinked checkout still yields one stable root.
    Ok(fs::canonicalize(&path).unwrap_or(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn falls_back_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_beads_dir_from(dir.path());
        assert_eq!(resolved, PathBuf::from(".beads"));
    }

    #[test]
    fn resolves_main_repo_beads_dir() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        assert!(git(dir.path(), &["init", "-q"]));
        fs::create_dir(dir.path().join(".beads")).unwrap();

        let resolved = resolve_beads_dir_from(dir.path());
        assert_eq!(
            resolved,
            fs::canonicalize(dir.path()).unwrap().join(".beads")
        );
    }

    #[test]
    fn falls_back_when_repo_has_no_beads_dir() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        assert!(git(dir.path(), &["init", "-q"]));

        assert_eq!(resolve_beads_dir_from(dir.path()), PathBuf::from(".beads"));
    }

    #[test]
    fn worktree_resolves_to_main_repo_store() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let main = dir.path().join("main");
        fs::create_dir(&main).unwrap();
        assert!(git(&main, &["init", "-q"]));
        assert!(git(&main, &["config", "user.email", "t@example.com"]));
        assert!(git(&main, &["config", "user.name", "t"]));
        fs::write(main.join("README"), "x").unwrap();
        assert!(git(&main, &["add", "README"]));
        assert!(git(&main, &["commit", "-q", "-m", "init"]));
        fs::create_dir(main.join(".beads")).unwrap();

        let worktree = dir.path().join("wt");
        assert!(git(
            &main,
            &["worktree", "add", "-q", worktree.to_str().unwrap()]
        ));

        let resolved = resolve_beads_dir_from(&worktree);
        assert_eq!(resolved, fs::canonicalize(&main).unwrap().join(".beads"));
    }
}
