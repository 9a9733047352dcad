//! Write-behind cache for the posting tables.
//!
//! The update pipeline read-modify-writes the same identifier key many
//! times per tag. This wrapper keeps decoded posting lists in a bounded
//! LRU; eviction writes dirty entries back and [CachedMap::sync] flushes
//! everything.

use super::XrefStore;
use crate::codec::Codec;
use anyhow::{Context, Result};
use log::trace;
use lru::LruCache;
use std::{num::NonZeroUsize, sync::Arc};

struct Slot<V> {
    value: V,
    dirty: bool,
}

pub struct CachedMap<V: Codec> {
    store: Arc<XrefStore>,
    cf: &'static str,
    cache: LruCache<Vec<u8>, Slot<V>>,
}

impl<V: Codec> CachedMap<V> {
    pub fn new(store: Arc<XrefStore>, cf: &'static str, capacity: usize) -> Self {
        Self {
            store,
            cf,
            cache: LruCache::new(NonZeroUsize::new(capacity).expect("nonzero cache capacity")),
        }
    }

    /// Does a record exist for `key`, in cache or on disk?
    pub fn exists(&mut self, key: &[u8]) -> Result<bool> {
        if self.cache.contains(key) {
            return Ok(true);
        }
        self.store.exists_raw(self.cf, key)
    }

    /// Load (or default-construct) the record for `key`, apply `f`, and
    /// keep the dirty result cached. Eviction writes back.
    pub fn update(&mut self, key: &[u8], f: impl FnOnce(&mut V)) -> Result<()> {
        if let Some(slot) = self.cache.get_mut(key) {
            f(&mut slot.value);
            slot.dirty = true;
            return Ok(());
        }

        let mut value = self
            .store
            .get_raw(self.cf, key)?
            .map(|bytes| {
                V::parse(&bytes).with_context(|| {
                    format!(
                        "corrupt {} record for key {:?}",
                        self.cf,
                        String::from_utf8_lossy(key)
                    )
                })
            })
            .transpose()?
            .unwrap_or_default();
        f(&mut value);

        if let Some((evicted_key, evicted)) = self
            .cache
            .push(key.to_vec(), Slot { value, dirty: true })
        {
            if evicted.dirty {
                self.store
                    .put_raw(self.cf, &evicted_key, &evicted.value.pack())?;
            }
        }
        Ok(())
    }

    /// Write every dirty entry back and flush the underlying map
    pub fn sync(&mut self) -> Result<()> {
        trace!("Flushing {} cached {} entries", self.cache.len(), self.cf);
        for (key, slot) in self.cache.iter_mut() {
            if slot.dirty {
                self.store.put_raw(self.cf, key, &slot.value.pack())?;
                slot.dirty = false;
            }
        }
        self.store.database.flush_cf(self.store.cf(self.cf))?;
        Ok(())
    }
}
