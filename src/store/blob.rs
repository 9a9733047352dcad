//! Blob bookkeeping trait: the hash <-> id <-> filename triple and the
//! `numBlobs` allocator bound.

use anyhow::Result;

pub trait BlobStore {
    /// Record a newly observed blob under the given id.
    /// Writes all three maps of the triple.
    fn add_blob(&self, hash: &str, filename: &str, idx: u32) -> Result<()>;

    /// Id of a known blob hash
    fn blob_id(&self, hash: &str) -> Result<Option<u32>>;

    /// Hash of a known blob id
    fn blob_hash(&self, idx: u32) -> Result<Option<String>>;

    /// Filename (basename) of a known blob id
    fn blob_filename(&self, idx: u32) -> Result<Option<String>>;

    /// Exclusive upper bound on assigned blob ids
    fn num_blobs(&self) -> Result<u32>;

    fn set_num_blobs(&self, num: u32) -> Result<()>;
}
