use super::{column_families::ColumnFamilyHelpers, version::VersionStore, XrefStore};
use crate::codec::{Codec, PathList};
use anyhow::{Context, Result};
use log::trace;

impl VersionStore for XrefStore {
    fn add_version(&self, tag: &str, paths: &PathList) -> Result<()> {
        trace!("Adding version {tag} with {} paths", paths.len());
        self.database
            .put_cf(self.versions_cf(), tag.as_bytes(), paths.pack())?;
        self.database.flush_cf(self.versions_cf())?;
        Ok(())
    }

    fn version(&self, tag: &str) -> Result<Option<PathList>> {
        self.database
            .get_cf(self.versions_cf(), tag.as_bytes())?
            .map(|bytes| {
                PathList::parse(&bytes)
                    .with_context(|| format!("corrupt versions record for tag {tag}"))
            })
            .transpose()
    }

    fn version_exists(&self, tag: &str) -> Result<bool> {
        Ok(self
            .database
            .get_pinned_cf(self.versions_cf(), tag.as_bytes())?
            .is_some())
    }
}
