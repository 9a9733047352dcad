//! Typed errors for the configuration and input-validation classes.
//!
//! Everything else propagates as [anyhow::Error]; not-found conditions in
//! the query API are empty results, never errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LXR_DATA_DIR needs to be set")]
    MissingDataDir,

    #[error("LXR_REPO_DIR needs to be set")]
    MissingRepoDir,

    #[error("data directory {0} does not exist")]
    DataDirNotFound(PathBuf),

    #[error("repository directory {0} does not exist")]
    RepoDirNotFound(PathBuf),

    #[error("invalid family {0:?}")]
    InvalidFamily(String),
}

/// A request parameter that failed its acceptance regex.
/// Rejected before reaching any core API.
#[derive(Debug, Error)]
#[error("invalid {field}: {value:?}")]
pub struct InvalidParam {
    pub field: &'static str,
    pub value: String,
}
