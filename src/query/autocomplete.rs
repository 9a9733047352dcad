//! Identifier prefix autocomplete.
//!
//! A forward cursor over the definitions map (or the compatible map for
//! family B), seeked to the smallest key >= the prefix, then stepped
//! while keys still carry the prefix. Relies on the store's
//! byte-lexicographic key order.

use super::Query;
use crate::{constants::AUTOCOMPLETE_LIMIT, dts, family::Family};
use anyhow::Result;
use percent_encoding::percent_decode;

impl Query {
    /// Up to [AUTOCOMPLETE_LIMIT] identifiers starting with `prefix`,
    /// in byte-lexicographic order
    pub fn autocomplete(&self, prefix: &str, family: Family) -> Result<Vec<String>> {
        let cf = if family == Family::B {
            "compatibledts"
        } else {
            "definitions"
        };
        // keys of both maps are stored percent-encoded forms for B and
        // plain bytes otherwise; quoting a plain ident is the identity
        let encoded = dts::quote(prefix);
        let seek = encoded.as_bytes();

        let mut out = vec![];
        for item in self.store().iter_raw_from(cf, seek) {
            let (key, _) = item?;
            if out.len() >= AUTOCOMPLETE_LIMIT || !key.starts_with(seek) {
                break;
            }
            let decoded = if family == Family::B {
                percent_decode(&key).decode_utf8_lossy().into_owned()
            } else {
                String::from_utf8_lossy(&key).into_owned()
            };
            out.push(decoded);
        }
        Ok(out)
    }
}
