//! Read access to the posting tables, used by the query engine and the
//! definitions-cache derivation. The update pipeline writes these tables
//! through [super::cache::CachedMap].

use crate::{
    codec::{DefList, RefList},
    family::Family,
};
use anyhow::Result;

pub trait PostingStore {
    fn def_list(&self, ident: &[u8]) -> Result<Option<DefList>>;

    fn ref_list(&self, ident: &[u8]) -> Result<Option<RefList>>;

    fn doc_list(&self, ident: &[u8]) -> Result<Option<RefList>>;

    fn comp_list(&self, ident: &[u8]) -> Result<Option<RefList>>;

    fn comp_doc_list(&self, ident: &[u8]) -> Result<Option<RefList>>;

    fn comp_exists(&self, ident: &[u8]) -> Result<bool>;

    /// Is `ident` defined somewhere that satisfies `family`?
    /// Backed by the per-family definitions cache.
    fn defs_cache_contains(&self, family: Family, ident: &[u8]) -> Result<bool>;

    fn add_defs_cache_entry(&self, family: Family, ident: &[u8]) -> Result<()>;
}
