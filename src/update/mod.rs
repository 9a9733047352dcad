//! The staged update pipeline.
//!
//! One producer thread walks the new tags in repository order, assigning
//! blob ids (Ids) and writing the per-tag path list (Versions). Behind
//! it, partitioned worker threads parse definitions, references,
//! doc-comments and DT compatibles for every new blob of each tag.
//!
//! Ordering is enforced per tag: Versions and Defs run after Ids,
//! Refs after Defs (so a reference is only recorded once its identifier
//! has a definition somewhere in the corpus), CompsDocs after Versions
//! and Comps. Stages of different tags overlap freely; workers own
//! disjoint tag indices (`tag_index % workers`).

use crate::{
    codec::{DefKind, DefList, PathList, RefList},
    constants::{CONFIG_PREFIX, DT_BINDINGS_PREFIX, PARSER_TIMEOUT, POSTING_CACHE_ENTRIES, TOKEN_NEWLINE_ESCAPE},
    dts,
    family::{compatible_family, compatible_macro, Family, CACHED_DEF_FAMILIES},
    ident::is_ident,
    repo::{BlobLine, DefLine, DocLine, Repo},
    store::{
        blob::BlobStore, cache::CachedMap, posting::PostingStore, version::VersionStore, XrefStore,
    },
};
use anyhow::{anyhow, Context, Result};
use log::{info, trace, warn};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Condvar, Mutex, OnceLock},
    time::Instant,
};

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Worker thread count per partitioned stage
    pub workers: usize,
    /// Index DT compatible strings
    pub dts_comp: bool,
    /// Entry bound of each posting table's write-behind cache
    pub cache_entries: usize,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            dts_comp: false,
            cache_entries: POSTING_CACHE_ENTRIES,
        }
    }
}

/// A one-shot completion event
#[derive(Debug, Default)]
struct Flag {
    state: Mutex<bool>,
    cond: Condvar,
}

impl Flag {
    fn set(&self) {
        let mut done = self.state.lock().unwrap();
        *done = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut done = self.state.lock().unwrap();
        while !*done {
            done = self.cond.wait(done).unwrap();
        }
    }
}

/// Per-tag pipeline state shared between the stages
#[derive(Debug)]
struct TagTask {
    tag: String,
    /// Blob ids first observed under this tag, ascending; set by Ids
    new_ids: OnceLock<Vec<u32>>,
    /// New ids whose path is under the DT bindings tree; set by Versions
    bindings: OnceLock<Vec<u32>>,
    ids_ready: Flag,
    versions_ready: Flag,
    defs_ready: Flag,
    comps_ready: Flag,
}

impl TagTask {
    fn new(tag: String) -> Self {
        Self {
            tag,
            new_ids: OnceLock::new(),
            bindings: OnceLock::new(),
            ids_ready: Flag::default(),
            versions_ready: Flag::default(),
            defs_ready: Flag::default(),
            comps_ready: Flag::default(),
        }
    }

    fn new_ids(&self) -> &[u32] {
        self.new_ids.get().expect("ids stage ran")
    }

    /// Unblock every waiter, publishing empty stage outputs.
    /// Used when a producer stage dies mid-tag.
    fn poison(&self) {
        let _ = self.new_ids.set(vec![]);
        let _ = self.bindings.set(vec![]);
        self.ids_ready.set();
        self.versions_ready.set();
    }
}

/// Tags flow through here in repository order. Workers at the tail block
/// on the condition variable until the producer appends the next tag or
/// closes the queue.
#[derive(Debug, Default)]
struct TagQueue {
    inner: Mutex<TagQueueState>,
    tag_ready: Condvar,
}

#[derive(Debug, Default)]
struct TagQueueState {
    tasks: Vec<Arc<TagTask>>,
    closed: bool,
}

impl TagQueue {
    fn push(&self, task: Arc<TagTask>) {
        let mut state = self.inner.lock().unwrap();
        state.tasks.push(task);
        self.tag_ready.notify_all();
    }

    fn close(&self) {
        let mut state = self.inner.lock().unwrap();
        state.closed = true;
        self.tag_ready.notify_all();
    }

    /// Task at position `index`, blocking until it exists.
    /// `None` once the queue is closed before reaching `index`.
    fn get(&self, index: usize) -> Option<Arc<TagTask>> {
        let mut state = self.inner.lock().unwrap();
        loop {
            if index < state.tasks.len() {
                return Some(state.tasks[index].clone());
            }
            if state.closed {
                return None;
            }
            state = self.tag_ready.wait(state).unwrap();
        }
    }
}

struct Pipeline<'a> {
    store: Arc<XrefStore>,
    repo: &'a Repo,
    queue: TagQueue,
    /// Guards the blob/hash/filename triple; held per id
    hash_file_lock: Mutex<()>,
    defs: Mutex<CachedMap<DefList>>,
    refs: Mutex<CachedMap<RefList>>,
    docs: Mutex<CachedMap<RefList>>,
    comps: Mutex<CachedMap<RefList>>,
    comps_docs: Mutex<CachedMap<RefList>>,
}

/// Index every tag not yet present in the versions map, then rebuild the
/// per-family definition caches.
pub fn run(store: Arc<XrefStore>, repo: &Repo, config: &UpdateConfig) -> Result<()> {
    let mut tag_buf = vec![];
    for tag in repo.list_tags()? {
        if !store.version_exists(&tag)? {
            tag_buf.push(tag);
        }
    }
    info!("found {} new tags", tag_buf.len());

    let pipeline = Pipeline {
        store: store.clone(),
        repo,
        queue: TagQueue::default(),
        hash_file_lock: Mutex::new(()),
        defs: Mutex::new(CachedMap::new(store.clone(), "definitions", config.cache_entries)),
        refs: Mutex::new(CachedMap::new(store.clone(), "references", config.cache_entries)),
        docs: Mutex::new(CachedMap::new(store.clone(), "doccomments", config.cache_entries)),
        comps: Mutex::new(CachedMap::new(store.clone(), "compatibledts", config.cache_entries)),
        comps_docs: Mutex::new(CachedMap::new(
            store.clone(),
            "compatibledts_docs",
            config.cache_entries,
        )),
    };

    let workers = config.workers.max(1);
    std::thread::scope(|s| {
        let pipeline = &pipeline;
        let mut handles = vec![s.spawn(move || pipeline.run_ids_versions(&tag_buf))];
        for worker in 0..workers {
            handles.push(s.spawn(move || pipeline.run_defs_worker(worker, workers)));
            handles.push(s.spawn(move || pipeline.run_refs_worker(worker, workers)));
            handles.push(s.spawn(move || pipeline.run_docs_worker(worker, workers)));
            if config.dts_comp {
                handles.push(s.spawn(move || pipeline.run_comps_worker(worker, workers)));
                handles.push(s.spawn(move || pipeline.run_comps_docs_worker(worker, workers)));
            }
        }

        let mut result = Ok(());
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                Err(_) => {
                    if result.is_ok() {
                        result = Err(anyhow!("update worker panicked"));
                    }
                }
            }
        }
        result
    })?;

    pipeline.sync_tables()?;
    generate_defs_caches(&store)?;
    store.sync()?;
    info!("update done");
    Ok(())
}

/// Rebuild `definitions-cache-{C,K,D,M}` from the full definitions table
pub fn generate_defs_caches(store: &XrefStore) -> Result<()> {
    use crate::codec::Codec;

    info!("generating definitions caches");
    for item in store.iter_raw("definitions") {
        let (key, value) = item?;
        let list = DefList::parse(&value).with_context(|| {
            format!(
                "corrupt definitions record for key {:?}",
                String::from_utf8_lossy(&key)
            )
        })?;
        let macros = list.get_macros();
        for family in CACHED_DEF_FAMILIES {
            if compatible_family(list.families(), family) || compatible_macro(&macros, family) {
                store.add_defs_cache_entry(family, &key)?;
            }
        }
    }
    Ok(())
}

impl Pipeline<'_> {
    // Producer: Ids then Versions, per tag, in repository order

    fn run_ids_versions(&self, tags: &[String]) -> Result<()> {
        let result = self.ids_versions_loop(tags);
        self.queue.close();
        result
    }

    fn ids_versions_loop(&self, tags: &[String]) -> Result<()> {
        for (index, tag) in tags.iter().enumerate() {
            let task = Arc::new(TagTask::new(tag.clone()));
            self.queue.push(task.clone());

            let outcome = (|| {
                let new_ids = self.update_blob_ids(&task)?;
                info!(
                    "{tag}: {} new blobs ({}/{})",
                    new_ids.len(),
                    index + 1,
                    tags.len()
                );
                let _ = task.new_ids.set(new_ids);
                task.ids_ready.set();
                self.update_versions(&task)
            })();

            match outcome {
                Ok(bindings) => {
                    let _ = task.bindings.set(bindings);
                    task.versions_ready.set();
                }
                Err(e) => {
                    task.poison();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Assign an id to every blob of the tag not seen under any earlier
    /// tag. Returns the fresh ids in ascending order.
    fn update_blob_ids(&self, task: &TagTask) -> Result<Vec<u32>> {
        let mut idx = self.store.num_blobs()?;
        let mut new_ids = vec![];
        for BlobLine { hash, name } in self.repo.list_blob_files(&task.tag)? {
            if self.store.blob_id(&hash)?.is_none() {
                {
                    let _guard = self.hash_file_lock.lock().unwrap();
                    self.store.add_blob(&hash, &name, idx)?;
                }
                new_ids.push(idx);
                idx += 1;
            }
        }
        self.store.set_num_blobs(idx)?;
        Ok(new_ids)
    }

    /// Write the tag's path list, sorted by blob id.
    /// Returns the new ids living under the DT bindings tree.
    fn update_versions(&self, task: &TagTask) -> Result<Vec<u32>> {
        let new_set: HashSet<u32> = task.new_ids().iter().copied().collect();
        let mut buf = vec![];
        let mut bindings = vec![];
        for BlobLine { hash, name: path } in self.repo.list_blob_paths(&task.tag)? {
            let idx = self.store.blob_id(&hash)?.with_context(|| {
                format!("blob {hash} unknown in versions stage of {} (ids must run first)", task.tag)
            })?;
            if new_set.contains(&idx) && path.starts_with(DT_BINDINGS_PREFIX) {
                bindings.push(idx);
            }
            trace!("tag {}: adding #{idx} {path}", task.tag);
            buf.push((idx, path));
        }

        buf.sort();
        let mut paths = PathList::default();
        for (idx, path) in buf {
            paths.append(idx, path);
        }
        self.store.add_version(&task.tag, &paths)?;

        bindings.sort_unstable();
        bindings.dedup();
        Ok(bindings)
    }

    // Partitioned workers. Each drains the whole queue but only processes
    // tags at its own indices; stage-completion flags are set even when a
    // blob fails, so downstream stages never stall.

    fn run_defs_worker(&self, worker: usize, stride: usize) -> Result<()> {
        let mut failed = None;
        let mut index = 0;
        while let Some(task) = self.queue.get(index) {
            if index % stride == worker {
                task.ids_ready.wait();
                if failed.is_none() {
                    failed = self.update_definitions(&task).err();
                }
                task.defs_ready.set();
            }
            index += 1;
        }
        failed.map_or(Ok(()), Err)
    }

    fn run_refs_worker(&self, worker: usize, stride: usize) -> Result<()> {
        let mut index = 0;
        while let Some(task) = self.queue.get(index) {
            if index % stride == worker {
                task.defs_ready.wait();
                self.update_references(&task)?;
            }
            index += 1;
        }
        Ok(())
    }

    fn run_docs_worker(&self, worker: usize, stride: usize) -> Result<()> {
        let mut index = 0;
        while let Some(task) = self.queue.get(index) {
            if index % stride == worker {
                task.ids_ready.wait();
                self.update_doc_comments(&task)?;
            }
            index += 1;
        }
        Ok(())
    }

    fn run_comps_worker(&self, worker: usize, stride: usize) -> Result<()> {
        let mut failed = None;
        let mut index = 0;
        while let Some(task) = self.queue.get(index) {
            if index % stride == worker {
                task.ids_ready.wait();
                if failed.is_none() {
                    failed = self.update_compatibles(&task).err();
                }
                task.comps_ready.set();
            }
            index += 1;
        }
        failed.map_or(Ok(()), Err)
    }

    fn run_comps_docs_worker(&self, worker: usize, stride: usize) -> Result<()> {
        let mut index = 0;
        while let Some(task) = self.queue.get(index) {
            if index % stride == worker {
                task.ids_ready.wait();
                task.comps_ready.wait();
                task.versions_ready.wait();
                self.update_compatible_docs(&task)?;
            }
            index += 1;
        }
        Ok(())
    }

    /// Hash and filename of a blob id, under the triple's lock
    fn hash_and_filename(&self, idx: u32) -> Result<(String, String)> {
        let _guard = self.hash_file_lock.lock().unwrap();
        let hash = self
            .store
            .blob_hash(idx)?
            .with_context(|| format!("no hash for blob #{idx}"))?;
        let filename = self
            .store
            .blob_filename(idx)?
            .with_context(|| format!("no filename for blob #{idx}"))?;
        Ok((hash, filename))
    }

    fn update_definitions(&self, task: &TagTask) -> Result<()> {
        for &idx in task.new_ids() {
            let (hash, filename) = self.hash_and_filename(idx)?;
            let Some(family) = Family::from_filename(&filename) else {
                continue;
            };
            if family == Family::M {
                continue;
            }

            let started = Instant::now();
            let lines = self.repo.parse_defs(&hash, &filename, family)?;
            if started.elapsed() > PARSER_TIMEOUT {
                warn!(
                    "parse-defs took {:.1?} on blob #{idx} ({family}), skipping",
                    started.elapsed()
                );
                continue;
            }

            for DefLine {
                ident,
                kind_letter,
                line,
            } in lines
            {
                let Some(kind) = DefKind::from_letter(kind_letter) else {
                    continue;
                };
                // Kconfig symbols are keyed with their CONFIG_ prefix
                let ident = if family == Family::K {
                    [CONFIG_PREFIX, ident.as_slice()].concat()
                } else {
                    ident
                };
                if !is_ident(&ident) {
                    continue;
                }
                trace!(
                    "def {kind} {} in #{idx} @ {line}",
                    String::from_utf8_lossy(&ident)
                );
                self.defs
                    .lock()
                    .unwrap()
                    .update(&ident, |list| list.append(idx, kind, line, family))?;
            }
        }
        Ok(())
    }

    fn update_references(&self, task: &TagTask) -> Result<()> {
        for &idx in task.new_ids() {
            let (hash, filename) = self.hash_and_filename(idx)?;
            let Some(family) = Family::from_filename(&filename) else {
                continue;
            };

            let started = Instant::now();
            let tokens = self.repo.tokenize_blob(&hash, family)?;
            if started.elapsed() > PARSER_TIMEOUT {
                warn!(
                    "tokenize-file took {:.1?} on blob #{idx} ({family}), skipping",
                    started.elapsed()
                );
                continue;
            }

            let prefix: &[u8] = if family == Family::K { CONFIG_PREFIX } else { b"" };
            let mut line_num: u32 = 1;
            let mut occurrences: HashMap<Vec<u8>, Vec<u32>> = HashMap::new();

            for (pos, tok) in tokens.iter().enumerate() {
                if pos % 2 == 1 {
                    let ident = [prefix, tok.as_slice()].concat();
                    // only CONFIG_ symbols are indexed in makefiles
                    if family == Family::M && !ident.starts_with(CONFIG_PREFIX) {
                        continue;
                    }
                    if !is_ident(&ident) {
                        continue;
                    }
                    // accept only identifiers that are defined somewhere
                    if self.defs.lock().unwrap().exists(&ident)? {
                        occurrences.entry(ident).or_default().push(line_num);
                    }
                } else {
                    line_num += tok.iter().filter(|&&b| b == TOKEN_NEWLINE_ESCAPE).count() as u32;
                }
            }

            for (ident, lines) in occurrences {
                trace!(
                    "ref {} in #{idx} @ {lines:?}",
                    String::from_utf8_lossy(&ident)
                );
                let joined = join_lines(&lines);
                self.refs
                    .lock()
                    .unwrap()
                    .update(&ident, |list| list.append(idx, joined, family))?;
            }
        }
        Ok(())
    }

    fn update_doc_comments(&self, task: &TagTask) -> Result<()> {
        for &idx in task.new_ids() {
            let (hash, filename) = self.hash_and_filename(idx)?;
            let Some(family) = Family::from_filename(&filename) else {
                continue;
            };
            if family == Family::M {
                continue;
            }

            let started = Instant::now();
            let lines = self.repo.parse_docs(&hash, &filename)?;
            if started.elapsed() > PARSER_TIMEOUT {
                warn!(
                    "parse-docs took {:.1?} on blob #{idx} ({family}), skipping",
                    started.elapsed()
                );
                continue;
            }

            for (ident, lines) in group_doc_lines(lines) {
                self.docs
                    .lock()
                    .unwrap()
                    .update(&ident, |list| list.append(idx, lines, family))?;
            }
        }
        Ok(())
    }

    fn update_compatibles(&self, task: &TagTask) -> Result<()> {
        for &idx in task.new_ids() {
            let (hash, filename) = self.hash_and_filename(idx)?;
            let family = match Family::from_filename(&filename) {
                Some(f @ (Family::C | Family::D)) => f,
                _ => continue,
            };

            let started = Instant::now();
            let content = self.repo.get_blob(&hash)?;
            let found = dts::scan(family, &content);
            if started.elapsed() > PARSER_TIMEOUT {
                warn!(
                    "compatible scan took {:.1?} on blob #{idx} ({family}), skipping",
                    started.elapsed()
                );
                continue;
            }

            for (ident, lines) in group_scan_lines(found) {
                self.comps
                    .lock()
                    .unwrap()
                    .update(ident.as_bytes(), |list| list.append(idx, lines, family))?;
            }
        }
        Ok(())
    }

    /// Compatible mentions in binding docs, only for strings already
    /// known to the code index
    fn update_compatible_docs(&self, task: &TagTask) -> Result<()> {
        let bindings = task.bindings.get().expect("versions stage ran");
        for &idx in bindings {
            let (hash, _) = self.hash_and_filename(idx)?;
            let content = self.repo.get_blob(&hash)?;

            for (ident, lines) in group_scan_lines(dts::scan(Family::B, &content)) {
                if !self.comps.lock().unwrap().exists(ident.as_bytes())? {
                    continue;
                }
                self.comps_docs
                    .lock()
                    .unwrap()
                    .update(ident.as_bytes(), |list| list.append(idx, lines, Family::B))?;
            }
        }
        Ok(())
    }

    fn sync_tables(&self) -> Result<()> {
        self.defs.lock().unwrap().sync()?;
        self.refs.lock().unwrap().sync()?;
        self.docs.lock().unwrap().sync()?;
        self.comps.lock().unwrap().sync()?;
        self.comps_docs.lock().unwrap().sync()?;
        Ok(())
    }
}

fn join_lines(lines: &[u32]) -> String {
    lines
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Group parse-docs output into per-ident comma-joined line lists,
/// in first-seen order
fn group_doc_lines(lines: Vec<DocLine>) -> Vec<(Vec<u8>, String)> {
    let mut order = vec![];
    let mut grouped: HashMap<Vec<u8>, Vec<u32>> = HashMap::new();
    for DocLine { ident, line } in lines {
        if !grouped.contains_key(&ident) {
            order.push(ident.clone());
        }
        grouped.entry(ident).or_default().push(line);
    }
    order
        .into_iter()
        .map(|ident| {
            let joined = join_lines(&grouped[&ident]);
            (ident, joined)
        })
        .collect()
}

/// Group compatible-scanner output the same way
fn group_scan_lines(found: Vec<(String, u32)>) -> Vec<(String, String)> {
    let mut order = vec![];
    let mut grouped: HashMap<String, Vec<u32>> = HashMap::new();
    for (ident, line) in found {
        if !grouped.contains_key(&ident) {
            order.push(ident.clone());
        }
        grouped.entry(ident).or_default().push(line);
    }
    order
        .into_iter()
        .map(|ident| {
            let joined = join_lines(&grouped[&ident]);
            (ident, joined)
        })
        .collect()
}
