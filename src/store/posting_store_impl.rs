use super::{column_families::ColumnFamilyHelpers, posting::PostingStore, XrefStore};
use crate::{
    codec::{Codec, DefList, RefList},
    family::Family,
};
use anyhow::{Context, Result};
use speedb::ColumnFamily;

impl XrefStore {
    fn ref_shaped(&self, cf: &ColumnFamily, which: &str, ident: &[u8]) -> Result<Option<RefList>> {
        self.database
            .get_cf(cf, ident)?
            .map(|bytes| {
                RefList::parse(&bytes).with_context(|| {
                    format!("corrupt {which} record for key {:?}", String::from_utf8_lossy(ident))
                })
            })
            .transpose()
    }
}

impl PostingStore for XrefStore {
    fn def_list(&self, ident: &[u8]) -> Result<Option<DefList>> {
        self.database
            .get_cf(self.definitions_cf(), ident)?
            .map(|bytes| {
                DefList::parse(&bytes).with_context(|| {
                    format!(
                        "corrupt definitions record for key {:?}",
                        String::from_utf8_lossy(ident)
                    )
                })
            })
            .transpose()
    }

    fn ref_list(&self, ident: &[u8]) -> Result<Option<RefList>> {
        self.ref_shaped(self.references_cf(), "references", ident)
    }

    fn doc_list(&self, ident: &[u8]) -> Result<Option<RefList>> {
        self.ref_shaped(self.doccomments_cf(), "doccomments", ident)
    }

    fn comp_list(&self, ident: &[u8]) -> Result<Option<RefList>> {
        self.ref_shaped(self.compatibledts_cf(), "compatibledts", ident)
    }

    fn comp_doc_list(&self, ident: &[u8]) -> Result<Option<RefList>> {
        self.ref_shaped(self.compatibledts_docs_cf(), "compatibledts_docs", ident)
    }

    fn comp_exists(&self, ident: &[u8]) -> Result<bool> {
        Ok(self
            .database
            .get_pinned_cf(self.compatibledts_cf(), ident)?
            .is_some())
    }

    fn defs_cache_contains(&self, family: Family, ident: &[u8]) -> Result<bool> {
        Ok(self
            .database
            .get_pinned_cf(self.definitions_cache_cf(family), ident)?
            .is_some())
    }

    fn add_defs_cache_entry(&self, family: Family, ident: &[u8]) -> Result<()> {
        Ok(self
            .database
            .put_cf(self.definitions_cache_cf(family), ident, b"")?)
    }
}
