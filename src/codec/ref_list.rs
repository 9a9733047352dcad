//! Reference-shaped posting lists, shared by the reference, doc-comment,
//! and DT-compatible tables.

use super::{take_bytes, take_u32, take_u8, Codec};
use crate::family::Family;
use anyhow::{bail, Context, Result};

/// One blob's occurrences of an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    pub idx: u32,
    /// Comma-joined ASCII decimal line numbers
    pub lines: String,
    pub family: Family,
}

/// All occurrence records of one identifier.
///
/// Packed layout: repeated
/// `{idx: u32 BE}{family letter: u8}{lines_len: u32 BE}{lines bytes}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefList {
    entries: Vec<RefEntry>,
}

impl RefList {
    pub fn append(&mut self, idx: u32, lines: impl Into<String>, family: Family) {
        self.entries.push(RefEntry {
            idx,
            lines: lines.into(),
            family,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries sorted by blob id
    pub fn iter(&self) -> impl Iterator<Item = RefEntry> {
        let mut entries = self.entries.clone();
        entries.sort_by_key(|e| e.idx);
        entries.into_iter()
    }
}

impl Codec for RefList {
    fn parse(mut bytes: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        while !bytes.is_empty() {
            let idx = take_u32(&mut bytes)?;
            let fam_letter = take_u8(&mut bytes)?;
            let Some(family) = Family::from_letter(fam_letter) else {
                bail!("bad family letter {fam_letter:#04x} in reference record");
            };
            let len = take_u32(&mut bytes)? as usize;
            let lines = std::str::from_utf8(take_bytes(&mut bytes, len)?)
                .context("non-UTF-8 line list in reference record")?
                .to_string();
            entries.push(RefEntry { idx, lines, family });
        }
        Ok(Self { entries })
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for e in &self.entries {
            out.extend_from_slice(&e.idx.to_be_bytes());
            out.push(e.family.letter());
            out.extend_from_slice(&(e.lines.len() as u32).to_be_bytes());
            out.extend_from_slice(e.lines.as_bytes());
        }
        out
    }
}
