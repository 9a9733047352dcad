//! Process configuration from the environment.

use crate::error::ConfigError;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "LXR_DATA_DIR";
pub const REPO_DIR_ENV: &str = "LXR_REPO_DIR";
pub const SCRIPT_ENV: &str = "LXR_SCRIPT";

/// Default helper executable name, resolved next to the repository
/// directory unless [SCRIPT_ENV] overrides it
pub const DEFAULT_SCRIPT: &str = "script.sh";

/// Resolved locations of the data directory, the repository, and the
/// repository helper executable
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub script: PathBuf,
}

impl Settings {
    /// Read `LXR_DATA_DIR`/`LXR_REPO_DIR` (both required) and
    /// `LXR_SCRIPT` (optional). Both directories must exist.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(std::env::var(DATA_DIR_ENV).map_err(|_| ConfigError::MissingDataDir)?);
        let repo_dir = PathBuf::from(std::env::var(REPO_DIR_ENV).map_err(|_| ConfigError::MissingRepoDir)?);
        if !repo_dir.is_dir() {
            return Err(ConfigError::RepoDirNotFound(repo_dir));
        }

        let script = match std::env::var(SCRIPT_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => repo_dir
                .parent()
                .unwrap_or(repo_dir.as_path())
                .join(DEFAULT_SCRIPT),
        };
        Ok(Self {
            data_dir,
            repo_dir,
            script,
        })
    }
}
