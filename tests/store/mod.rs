use crate::helpers::setup_new_db_dir;
use elixir_indexer::{
    codec::{Codec, PathList, RefList},
    family::Family,
    store::{
        blob::BlobStore, cache::CachedMap, posting::PostingStore, version::VersionStore, XrefStore,
    },
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn blob_triple_is_a_bijection() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("store-blob-triple")?;
    let store = XrefStore::new(store_dir.path())?;

    let hashes = ["aa00", "bb11", "cc22", "dd33"];
    for (idx, hash) in hashes.iter().enumerate() {
        store.add_blob(hash, &format!("f{idx}.c"), idx as u32)?;
    }
    store.set_num_blobs(hashes.len() as u32)?;

    assert_eq!(store.num_blobs()?, 4);
    for (idx, hash) in hashes.iter().enumerate() {
        let idx = idx as u32;
        assert_eq!(store.blob_id(hash)?, Some(idx));
        assert_eq!(store.blob_hash(idx)?.as_deref(), Some(*hash));
        assert_eq!(store.blob_filename(idx)?, Some(format!("f{idx}.c")));
    }
    assert_eq!(store.blob_id("ee44")?, None);
    assert_eq!(store.blob_hash(4)?, None);
    Ok(())
}

#[test]
fn version_store_round_trip() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("store-versions")?;
    let store = XrefStore::new(store_dir.path())?;

    let mut paths = PathList::default();
    paths.append(0, "/Makefile");
    paths.append(2, "/src/a.c");
    store.add_version("v1.0", &paths)?;

    assert!(store.version_exists("v1.0")?);
    assert!(!store.version_exists("v2.0")?);
    assert_eq!(store.version("v1.0")?, Some(paths));
    assert_eq!(store.version("v2.0")?, None);
    Ok(())
}

#[test]
fn defs_cache_membership() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("store-defs-cache")?;
    let store = XrefStore::new(store_dir.path())?;

    store.add_defs_cache_entry(Family::C, b"spin_lock")?;
    assert!(store.defs_cache_contains(Family::C, b"spin_lock")?);
    assert!(!store.defs_cache_contains(Family::K, b"spin_lock")?);
    assert!(!store.defs_cache_contains(Family::C, b"other")?);
    Ok(())
}

#[test]
fn cached_map_writes_back_on_eviction_and_sync() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("store-cached-map")?;
    let store = Arc::new(XrefStore::new(store_dir.path())?);

    let mut cached: CachedMap<RefList> = CachedMap::new(store.clone(), "references", 2);
    cached.update(b"alpha", |list| list.append(0, "1", Family::C))?;
    cached.update(b"beta", |list| list.append(1, "2", Family::C))?;
    // evicts alpha, which must be written back
    cached.update(b"gamma", |list| list.append(2, "3", Family::C))?;

    let alpha = store.get_raw("references", b"alpha")?.expect("alpha written back");
    assert_eq!(RefList::parse(&alpha)?.iter().count(), 1);

    // beta and gamma are only in the cache until sync
    cached.sync()?;
    for key in [b"beta".as_slice(), b"gamma".as_slice()] {
        assert!(store.get_raw("references", key)?.is_some());
    }

    // updating through the cache accumulates entries
    cached.update(b"alpha", |list| list.append(5, "9", Family::K))?;
    cached.sync()?;
    let alpha = store.get_raw("references", b"alpha")?.unwrap();
    assert_eq!(RefList::parse(&alpha)?.iter().count(), 2);
    Ok(())
}

#[test]
fn read_only_requires_existing_data_dir() {
    assert!(XrefStore::read_only(std::path::Path::new("/nonexistent/lxr-data")).is_err());
}

#[test]
fn store_version_is_recorded() -> anyhow::Result<()> {
    let store_dir = setup_new_db_dir("store-version-record")?;
    let store = XrefStore::new(store_dir.path())?;
    let version = store.store_version()?;
    assert_eq!(version.major, 1);
    Ok(())
}
