//! Column family helpers impl

use crate::{
    family::Family,
    store::{column_families::ColumnFamilyHelpers, XrefStore},
};
use speedb::ColumnFamily;

impl ColumnFamilyHelpers for XrefStore {
    /// CF for scalar bookkeeping
    /// ```text
    /// key: fixed key bytes
    /// val: u32 BE bytes or serde_json record
    /// ```
    fn variables_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("variables")
            .expect("variables column family exists")
    }

    /// CF mapping blob hash to blob id
    /// ```text
    /// key: hash hex bytes
    /// val: u32 BE bytes
    /// ```
    fn blobs_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("blobs")
            .expect("blobs column family exists")
    }

    /// CF mapping blob id back to blob hash
    /// ```text
    /// key: u32 BE bytes
    /// val: hash hex bytes
    /// ```
    fn hashes_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("hashes")
            .expect("hashes column family exists")
    }

    /// CF mapping blob id to filename
    /// ```text
    /// key: u32 BE bytes
    /// val: basename bytes
    /// ```
    fn filenames_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("filenames")
            .expect("filenames column family exists")
    }

    /// CF mapping tag to path list
    /// ```text
    /// key: tag bytes
    /// val: [PathList] packed bytes
    /// ```
    fn versions_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("versions")
            .expect("versions column family exists")
    }

    /// CF for definition posting lists
    /// ```text
    /// key: identifier bytes
    /// val: [DefList] packed bytes
    /// ```
    fn definitions_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("definitions")
            .expect("definitions column family exists")
    }

    /// CF caching identifiers defined for a requested family
    /// ```text
    /// key: identifier bytes
    /// val: b""
    /// ```
    fn definitions_cache_cf(&self, family: Family) -> &ColumnFamily {
        let name = match family {
            Family::C => "definitions-cache-C",
            Family::K => "definitions-cache-K",
            Family::D => "definitions-cache-D",
            Family::M => "definitions-cache-M",
            _ => unreachable!("no definitions cache for family {family}"),
        };
        self.database
            .cf_handle(name)
            .expect("definitions cache column family exists")
    }

    /// CF for reference posting lists
    /// ```text
    /// key: identifier bytes
    /// val: [RefList] packed bytes
    /// ```
    fn references_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("references")
            .expect("references column family exists")
    }

    /// CF for doc-comment posting lists
    /// ```text
    /// key: identifier bytes
    /// val: [RefList] packed bytes
    /// ```
    fn doccomments_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("doccomments")
            .expect("doccomments column family exists")
    }

    /// CF for DT-compatible occurrences in code
    /// ```text
    /// key: percent-encoded compatible string bytes
    /// val: [RefList] packed bytes
    /// ```
    fn compatibledts_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("compatibledts")
            .expect("compatibledts column family exists")
    }

    /// CF for DT-compatible occurrences in binding docs
    /// ```text
    /// key: percent-encoded compatible string bytes
    /// val: [RefList] packed bytes
    /// ```
    fn compatibledts_docs_cf(&self) -> &ColumnFamily {
        self.database
            .cf_handle("compatibledts_docs")
            .expect("compatibledts_docs column family exists")
    }
}
