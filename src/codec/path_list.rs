//! Per-tag path lists.

use super::{take_bytes, take_u16, take_u32, Codec};
use anyhow::{Context, Result};

/// One file visible at a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub idx: u32,
    pub path: String,
}

/// The ordered set of `(blob id, path)` pairs of one tag.
/// The Versions stage inserts in ascending blob-id order; iteration is
/// insertion order.
///
/// Packed layout: repeated `{idx: u32 BE}{path_len: u16 BE}{path bytes}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList {
    entries: Vec<PathEntry>,
}

impl PathList {
    pub fn append(&mut self, idx: u32, path: impl Into<String>) {
        self.entries.push(PathEntry {
            idx,
            path: path.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Codec for PathList {
    fn parse(mut bytes: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        while !bytes.is_empty() {
            let idx = take_u32(&mut bytes)?;
            let len = take_u16(&mut bytes)? as usize;
            let path = std::str::from_utf8(take_bytes(&mut bytes, len)?)
                .context("non-UTF-8 path in version record")?
                .to_string();
            entries.push(PathEntry { idx, path });
        }
        Ok(Self { entries })
    }

    fn pack(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for e in &self.entries {
            out.extend_from_slice(&e.idx.to_be_bytes());
            out.extend_from_slice(&(e.path.len() as u16).to_be_bytes());
            out.extend_from_slice(e.path.as_bytes());
        }
        out
    }
}
