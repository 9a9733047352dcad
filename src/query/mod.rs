//! The query engine.
//!
//! A [Query] owns a read-only store handle plus the repository adapter
//! and answers identifier searches, file views and autocomplete without
//! taking any global locks. Identifier search is a streaming merge-join:
//! the tag's path list is walked once, in blob-id order, alongside the
//! identifier's posting lists.

pub mod autocomplete;

use crate::{
    codec::{DefEntry, RefEntry},
    config::Settings,
    constants::{CONFIG_PREFIX, IDENT_MARK_CLOSE, IDENT_MARK_OPEN, SENTINEL_IDX, TOKEN_NEWLINE_ESCAPE},
    dts,
    family::{compatible_family, compatible_macro, Family},
    repo::{DirEntry, ObjectType, Repo, TagMenuLine},
    store::{posting::PostingStore, version::VersionStore, XrefStore},
};
use anyhow::{Context, Result};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Mutex,
};

/// One search result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInstance {
    pub path: String,
    /// A single line number or a comma-joined list
    pub lines: String,
    pub kind: Option<&'static str>,
}

impl fmt::Display for SymbolInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.lines)?;
        if let Some(kind) = self.kind {
            write!(f, " ({kind})")?;
        }
        Ok(())
    }
}

/// The three result lists of an identifier search. For family B lookups
/// the buckets hold C occurrences, DTS occurrences, and binding-doc
/// mentions respectively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub definitions: Vec<SymbolInstance>,
    pub references: Vec<SymbolInstance>,
    pub doc_comments: Vec<SymbolInstance>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.references.is_empty() && self.doc_comments.is_empty()
    }
}

/// Database statistics for the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub versions: usize,
    pub blobs: usize,
    pub hashes: usize,
    pub filenames: usize,
    pub definitions: usize,
    pub references: usize,
}

pub struct Query {
    store: XrefStore,
    repo: Repo,
    dts_comp: bool,
    /// Per-tag memo of the paths and directories visible at that tag
    file_cache: Mutex<HashMap<String, HashSet<String>>>,
}

impl Query {
    pub fn open(settings: &Settings) -> Result<Self> {
        let store = XrefStore::read_only(&settings.data_dir)?;
        let repo = Repo::from_settings(settings);
        let dts_comp = repo.dts_comp()?;
        Ok(Self::from_parts(store, repo, dts_comp))
    }

    pub fn from_parts(store: XrefStore, repo: Repo, dts_comp: bool) -> Self {
        Self {
            store,
            repo,
            dts_comp,
            file_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &XrefStore {
        &self.store
    }

    pub fn dts_comp_supported(&self) -> bool {
        self.dts_comp
    }

    pub fn dts_comp_exists(&self, ident: &str) -> Result<bool> {
        if !self.dts_comp {
            return Ok(false);
        }
        self.store.comp_exists(dts::quote(ident).as_bytes())
    }

    /// Newest indexed tag; falls back to the last line of the sorted-tags
    /// stream when none is indexed yet
    pub fn latest(&self) -> Result<String> {
        let sorted_tags = self.repo.latest_tags()?;
        for tag in &sorted_tags {
            if self.store.version_exists(tag)? {
                return Ok(tag.clone());
            }
        }
        sorted_tags
            .last()
            .cloned()
            .context("no tags returned by get-latest-tags")
    }

    /// Indexed tags with their menu placement, in repository order
    pub fn versions(&self) -> Result<Vec<TagMenuLine>> {
        let mut out = vec![];
        for line in self.repo.list_tags_with_menus()? {
            if self.store.version_exists(&line.tag)? {
                out.push(line);
            }
        }
        Ok(out)
    }

    pub fn get_type(&self, tag: &str, path: &str) -> Result<ObjectType> {
        self.repo.get_type(tag, path)
    }

    pub fn get_dir(&self, tag: &str, path: &str) -> Result<Vec<DirEntry>> {
        self.repo.get_dir(tag, path)
    }

    pub fn get_file(&self, tag: &str, path: &str) -> Result<Vec<u8>> {
        self.repo.get_file(tag, path)
    }

    /// Is `path` a file or directory visible at `tag`?
    pub fn file_exists(&self, tag: &str, path: &str) -> Result<bool> {
        let mut cache = self.file_cache.lock().unwrap();
        if !cache.contains_key(tag) {
            let mut seen = HashSet::new();
            if let Some(paths) = self.store.version(tag)? {
                let mut last_dir: Option<String> = None;
                for entry in paths.iter() {
                    let path = entry.path.trim_start_matches('/');
                    if let Some((dir, _)) = path.rsplit_once('/') {
                        if last_dir.as_deref() != Some(dir) {
                            last_dir = Some(dir.to_string());
                            seen.insert(dir.to_string());
                        }
                    }
                    seen.insert(path.to_string());
                }
            }
            cache.insert(tag.to_string(), seen);
        }
        Ok(cache[tag].contains(path.trim_matches('/')))
    }

    /// File content with known identifiers wrapped in ANSI markers.
    /// Families without a definitions cache are returned raw.
    pub fn get_tokenized_file(&self, tag: &str, path: &str) -> Result<Vec<u8>> {
        let filename = path.rsplit('/').next().unwrap_or(path);
        let Some(family) = Family::from_filename(filename) else {
            return self.repo.get_file(tag, path);
        };

        let tokens = self.repo.tokenize_path(tag, path, family)?;
        let prefix: &[u8] = if family == Family::K { CONFIG_PREFIX } else { b"" };
        let mut out = vec![];
        for (pos, tok) in tokens.iter().enumerate() {
            if pos % 2 == 1 {
                let ident = [prefix, tok.as_slice()].concat();
                if self.store.defs_cache_contains(family, &ident)? {
                    out.extend_from_slice(IDENT_MARK_OPEN);
                    out.extend_from_slice(&ident);
                    out.extend_from_slice(IDENT_MARK_CLOSE);
                    continue;
                }
            }
            out.extend(tok.iter().map(|&b| if b == TOKEN_NEWLINE_ESCAPE { b'\n' } else { b }));
        }
        Ok(out)
    }

    /// Where is `ident` defined, referenced, and documented at `tag`?
    /// Family B resolves as a DT-compatible lookup.
    pub fn search_ident(&self, tag: &str, ident: &str, family: Family) -> Result<SearchResults> {
        if family == Family::B {
            self.compatible_results(tag, ident)
        } else {
            self.ident_results(tag, ident, family)
        }
    }

    fn ident_results(&self, tag: &str, ident: &str, family: Family) -> Result<SearchResults> {
        let key = ident.as_bytes();
        let Some(def_list) = self.store.def_list(key)? else {
            return Ok(SearchResults::default());
        };
        let Some(paths) = self.store.version(tag)? else {
            return Ok(SearchResults::default());
        };

        let macros = def_list.get_macros();
        let mut defs = PostingStream::new(def_list.iter());
        let mut refs = PostingStream::new(self.store.ref_list(key)?.unwrap_or_default().iter());
        let mut docs = PostingStream::new(self.store.doc_list(key)?.unwrap_or_default().iter());

        let mut d_buf: Vec<(String, &'static str, u32)> = vec![];
        let mut r_buf = vec![];
        let mut doc_buf = vec![];

        for entry in paths.iter() {
            let file_idx = entry.idx;
            defs.skip_below(file_idx);
            refs.skip_below(file_idx);
            docs.skip_below(file_idx);

            while let Some(d) = defs.take_at(file_idx) {
                if d.family == family
                    || family == Family::A
                    || compatible_macro(&macros, family)
                {
                    d_buf.push((entry.path.clone(), d.kind.name(), d.line));
                }
            }
            if let Some(r) = refs.peek_at(file_idx) {
                if family == Family::A || compatible_family(&[family], r.family) {
                    r_buf.push((entry.path.clone(), r.lines.clone()));
                }
            }
            if let Some(doc) = docs.peek_at(file_idx) {
                doc_buf.push((entry.path.clone(), doc.lines.clone()));
            }
        }

        // cluster kinds together, most specific first, paths sorted
        // within a kind
        d_buf.sort();
        d_buf.sort_by(|a, b| b.1.cmp(a.1));
        r_buf.sort();
        doc_buf.sort();

        Ok(SearchResults {
            definitions: d_buf
                .into_iter()
                .map(|(path, kind, line)| SymbolInstance {
                    path,
                    lines: line.to_string(),
                    kind: Some(kind),
                })
                .collect(),
            references: symbol_instances(r_buf),
            doc_comments: symbol_instances(doc_buf),
        })
    }

    /// DT-compatible lookup: defined in C files, used in DTS files,
    /// documented under the bindings tree
    fn compatible_results(&self, tag: &str, ident: &str) -> Result<SearchResults> {
        let encoded = dts::quote(ident);
        let key = encoded.as_bytes();
        if !self.dts_comp || !self.store.comp_exists(key)? {
            return Ok(SearchResults::default());
        }
        let Some(paths) = self.store.version(tag)? else {
            return Ok(SearchResults::default());
        };

        let mut comps = PostingStream::new(self.store.comp_list(key)?.unwrap_or_default().iter());
        let mut comps_docs =
            PostingStream::new(self.store.comp_doc_list(key)?.unwrap_or_default().iter());

        let mut c_buf = vec![];
        let mut d_buf = vec![];
        let mut b_buf = vec![];

        for entry in paths.iter() {
            let file_idx = entry.idx;
            comps.skip_below(file_idx);
            comps_docs.skip_below(file_idx);

            if let Some(c) = comps.peek_at(file_idx) {
                match c.family {
                    Family::C => c_buf.push((entry.path.clone(), c.lines.clone())),
                    Family::D => d_buf.push((entry.path.clone(), c.lines.clone())),
                    _ => {}
                }
            }
            if let Some(cd) = comps_docs.peek_at(file_idx) {
                b_buf.push((entry.path.clone(), cd.lines.clone()));
            }
        }

        c_buf.sort();
        d_buf.sort();
        b_buf.sort();

        Ok(SearchResults {
            definitions: c_buf
                .into_iter()
                .map(|(path, lines)| SymbolInstance {
                    path,
                    lines,
                    kind: Some("compatible"),
                })
                .collect(),
            references: symbol_instances(d_buf),
            doc_comments: symbol_instances(b_buf),
        })
    }

    pub fn stats(&self) -> Stats {
        Stats {
            versions: self.store.len_raw("versions"),
            blobs: self.store.len_raw("blobs"),
            hashes: self.store.len_raw("hashes"),
            filenames: self.store.len_raw("filenames"),
            definitions: self.store.len_raw("definitions"),
            references: self.store.len_raw("references"),
        }
    }
}

fn symbol_instances(buf: Vec<(String, String)>) -> Vec<SymbolInstance> {
    buf.into_iter()
        .map(|(path, lines)| SymbolInstance {
            path,
            lines,
            kind: None,
        })
        .collect()
}

/// A posting iterator with an implicit terminal sentinel: once exhausted
/// it reports an id greater than any real blob id, so the merge-join
/// below needs no end-of-list special case.
struct PostingStream<T, I> {
    head: Option<T>,
    rest: I,
}

trait HasIdx {
    fn idx(&self) -> u32;
}

impl HasIdx for DefEntry {
    fn idx(&self) -> u32 {
        self.idx
    }
}

impl HasIdx for RefEntry {
    fn idx(&self) -> u32 {
        self.idx
    }
}

impl<T: HasIdx, I: Iterator<Item = T>> PostingStream<T, I> {
    fn new(mut it: I) -> Self {
        Self {
            head: it.next(),
            rest: it,
        }
    }

    fn idx(&self) -> u32 {
        self.head.as_ref().map_or(SENTINEL_IDX, HasIdx::idx)
    }

    fn skip_below(&mut self, idx: u32) {
        while self.idx() < idx {
            self.head = self.rest.next();
        }
    }

    /// Pop the head if it belongs to blob `idx`
    fn take_at(&mut self, idx: u32) -> Option<T> {
        if self.idx() == idx {
            let head = self.head.take();
            self.head = self.rest.next();
            head
        } else {
            None
        }
    }

    /// Head entry if it belongs to blob `idx`, without advancing
    fn peek_at(&self, idx: u32) -> Option<&T> {
        if self.idx() == idx {
            self.head.as_ref()
        } else {
            None
        }
    }
}
