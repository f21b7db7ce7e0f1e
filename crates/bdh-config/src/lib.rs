//! Workspace configuration for bdh.
//!
//! A workspace is one agent's working copy of a repository, described by a
//! `.beadhub` YAML file in or above the current directory. Discovery never
//! crosses a nested git root: the first ancestor containing `.git` is the
//! last directory examined, so a repository embedded in another repository
//! cannot accidentally adopt the outer workspace's identity.

mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use validation::normalize_role;

/// Name of the workspace configuration file.
pub const CONFIG_FILE_NAME: &str = ".beadhub";

/// Configuration errors, split so callers can tolerate absence while
/// treating malformed files as fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {CONFIG_FILE_NAME} found in {} or its ancestors", .start.display())]
    Missing { start: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Contents of `.beadhub`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub workspace_id: String,
    pub beadhub_url: String,
    pub project_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<String>,
    pub repo_origin: String,
    pub canonical_origin: String,
    pub alias: String,
    pub human_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default = "default_true")]
    pub auto_reserve: bool,
    #[serde(default)]
    pub reserve_untracked: bool,
}

fn default_true() -> bool {
    true
}

/// A configuration together with where it was found.
///
/// The directory holding `.beadhub` is the workspace root; the sync watermark
/// lives beneath it, not beneath the issue store.
#[derive(Debug, Clone)]
pub struct DiscoveredConfig {
    pub config: WorkspaceConfig,
    pub workspace_root: PathBuf,
    pub path: PathBuf,
}

impl WorkspaceConfig {
    /// Discover and load the workspace configuration from the current
    /// directory upward.
    pub fn discover() -> Result<DiscoveredConfig, ConfigError> {
        let start = std::env::current_dir().map_err(|source| ConfigError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Self::discover_from(&start)
    }

    /// Path-driven discovery variant used by tests.
    pub fn discover_from(start: &Path) -> Result<DiscoveredConfig, ConfigError> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(DiscoveredConfig {
                    config,
                    workspace_root: dir.to_path_buf(),
                    path: candidate,
                });
            }
            // A git root bounds the walk: never adopt config from outside
            // the repository the caller is standing in.
            if dir.join(".git").exists() {
                break;
            }
        }
        Err(ConfigError::Missing {
            start: start.to_path_buf(),
        })
    }

    /// Load and validate one explicit file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: WorkspaceConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate_and_normalize()?;
        Ok(config)
    }

    /// Serialize to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}
