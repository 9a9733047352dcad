use super::{
    blob::BlobStore, column_families::ColumnFamilyHelpers, fixed_keys::FixedKeys, from_be_bytes,
    to_be_bytes, XrefStore,
};
use anyhow::{Context, Result};
use log::trace;

impl BlobStore for XrefStore {
    fn add_blob(&self, hash: &str, filename: &str, idx: u32) -> Result<()> {
        trace!("Adding blob #{idx} {hash}:{filename}");
        self.database
            .put_cf(self.blobs_cf(), hash.as_bytes(), to_be_bytes(idx))?;
        self.database
            .put_cf(self.hashes_cf(), to_be_bytes(idx), hash.as_bytes())?;
        self.database
            .put_cf(self.filenames_cf(), to_be_bytes(idx), filename.as_bytes())?;
        Ok(())
    }

    fn blob_id(&self, hash: &str) -> Result<Option<u32>> {
        Ok(self
            .database
            .get_cf(self.blobs_cf(), hash.as_bytes())?
            .map(from_be_bytes))
    }

    fn blob_hash(&self, idx: u32) -> Result<Option<String>> {
        self.database
            .get_cf(self.hashes_cf(), to_be_bytes(idx))?
            .map(|bytes| String::from_utf8(bytes).context("non-UTF-8 blob hash"))
            .transpose()
    }

    fn blob_filename(&self, idx: u32) -> Result<Option<String>> {
        self.database
            .get_cf(self.filenames_cf(), to_be_bytes(idx))?
            .map(|bytes| String::from_utf8(bytes).context("non-UTF-8 filename"))
            .transpose()
    }

    fn num_blobs(&self) -> Result<u32> {
        Ok(self
            .database
            .get_cf(self.variables_cf(), Self::NUM_BLOBS_KEY)?
            .map(from_be_bytes)
            .unwrap_or(0))
    }

    fn set_num_blobs(&self, num: u32) -> Result<()> {
        trace!("Setting numBlobs to {num}");
        Ok(self
            .database
            .put_cf(self.variables_cf(), Self::NUM_BLOBS_KEY, to_be_bytes(num))?)
    }
}
