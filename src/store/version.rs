//! Per-tag path index trait.

use crate::codec::PathList;
use anyhow::Result;

pub trait VersionStore {
    /// Persist the path list of a tag, durably (a tag's presence in the
    /// versions map is the marker that it has been indexed)
    fn add_version(&self, tag: &str, paths: &PathList) -> Result<()>;

    fn version(&self, tag: &str) -> Result<Option<PathList>>;

    fn version_exists(&self, tag: &str) -> Result<bool>;
}
