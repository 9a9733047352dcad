//! Column family helpers trait

use crate::family::Family;
use speedb::ColumnFamily;

pub trait ColumnFamilyHelpers {
    /// CF for scalar bookkeeping (`numBlobs`, store version)
    fn variables_cf(&self) -> &ColumnFamily;

    /// CF mapping blob hash to blob id
    fn blobs_cf(&self) -> &ColumnFamily;

    /// CF mapping blob id back to blob hash
    fn hashes_cf(&self) -> &ColumnFamily;

    /// CF mapping blob id to filename (basename)
    fn filenames_cf(&self) -> &ColumnFamily;

    /// CF mapping tag to its path list
    fn versions_cf(&self) -> &ColumnFamily;

    /// CF for definition posting lists
    fn definitions_cf(&self) -> &ColumnFamily;

    /// CF caching which identifiers are defined for a requested family
    fn definitions_cache_cf(&self, family: Family) -> &ColumnFamily;

    /// CF for reference posting lists
    fn references_cf(&self) -> &ColumnFamily;

    /// CF for doc-comment posting lists
    fn doccomments_cf(&self) -> &ColumnFamily;

    /// CF for DT-compatible occurrences in code
    fn compatibledts_cf(&self) -> &ColumnFamily;

    /// CF for DT-compatible occurrences in binding docs
    fn compatibledts_docs_cf(&self) -> &ColumnFamily;
}
