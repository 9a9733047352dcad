//! This module contains the implementations of all store traits for the
//! [XrefStore]

// traits
pub mod blob;
pub mod column_families;
pub mod fixed_keys;
pub mod posting;
pub mod version;

// impls
pub mod blob_store_impl;
pub mod column_families_impl;
pub mod posting_store_impl;
pub mod version_store_impl;

pub mod cache;

use self::fixed_keys::FixedKeys;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use speedb::{ColumnFamily, ColumnFamilyDescriptor, DBCompressionType, DBIterator, IteratorMode, DB};
use std::path::{Path, PathBuf};

/// The cross-reference database: one speedb instance with one column
/// family per ordered map.
#[derive(Debug)]
pub struct XrefStore {
    pub db_path: PathBuf,
    pub database: DB,
    pub is_primary: bool,
}

/// Format version of the on-disk layout, stored in `variables` on create
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefStoreVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl XrefStoreVersion {
    pub const MAJOR: u32 = 1;
    pub const MINOR: u32 = 0;
    pub const PATCH: u32 = 0;
}

impl XrefStore {
    /// Modify [XrefStoreVersion] when adding a column family!
    const COLUMN_FAMILIES: [&'static str; 14] = [
        "variables",
        "blobs",
        "hashes",
        "filenames",
        "versions",
        "definitions",
        "definitions-cache-C",
        "definitions-cache-K",
        "definitions-cache-D",
        "definitions-cache-M",
        "references",
        "doccomments",
        "compatibledts",
        "compatibledts_docs",
    ];

    /// Creates or opens the _primary_ (writable) store
    pub fn new(path: &Path) -> Result<Self> {
        let mut cf_opts = speedb::Options::default();
        cf_opts.set_max_write_buffer_number(16);
        cf_opts.set_compression_type(DBCompressionType::Zstd);

        let mut database_opts = speedb::Options::default();
        database_opts.set_compression_type(DBCompressionType::Zstd);
        database_opts.create_missing_column_families(true);
        database_opts.create_if_missing(true);

        let column_families: Vec<ColumnFamilyDescriptor> = Self::COLUMN_FAMILIES
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();
        let primary = Self {
            is_primary: true,
            db_path: path.into(),
            database: DB::open_cf_descriptors(&database_opts, path, column_families)?,
        };

        primary.set_store_version(
            XrefStoreVersion::MAJOR,
            XrefStoreVersion::MINOR,
            XrefStoreVersion::PATCH,
        )?;
        Ok(primary)
    }

    /// Opens an existing store read-only, suitable for concurrent query
    /// threads while an update process may be writing
    pub fn read_only(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(ConfigError::DataDirNotFound(path.into()).into());
        }
        let database_opts = speedb::Options::default();
        Ok(Self {
            is_primary: false,
            db_path: path.into(),
            database: DB::open_cf_for_read_only(
                &database_opts,
                path,
                Self::COLUMN_FAMILIES,
                false,
            )?,
        })
    }

    fn set_store_version(&self, major: u32, minor: u32, patch: u32) -> Result<()> {
        let version = XrefStoreVersion {
            major,
            minor,
            patch,
        };
        log::trace!("Setting store version: {version:?}");
        if self
            .database
            .get_cf(self.cf("variables"), Self::STORE_VERSION_KEY)?
            .is_none()
        {
            self.database.put_cf(
                self.cf("variables"),
                Self::STORE_VERSION_KEY,
                serde_json::to_vec(&version)?,
            )?;
        }
        Ok(())
    }

    pub fn store_version(&self) -> Result<XrefStoreVersion> {
        let bytes = self
            .database
            .get_cf(self.cf("variables"), Self::STORE_VERSION_KEY)?
            .context("store version record missing")?;
        serde_json::from_slice(&bytes).context("corrupt store version record")
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Column family handle by name
    pub fn cf(&self, name: &str) -> &ColumnFamily {
        self.database
            .cf_handle(name)
            .expect("column family exists")
    }

    // Raw map operations shared by the trait impls and the posting cache

    pub fn get_raw(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.database.get_cf(self.cf(cf), key)?)
    }

    pub fn put_raw(&self, cf: &str, key: &[u8], value: &[u8]) -> Result<()> {
        Ok(self.database.put_cf(self.cf(cf), key, value)?)
    }

    pub fn exists_raw(&self, cf: &str, key: &[u8]) -> Result<bool> {
        Ok(self.database.get_pinned_cf(self.cf(cf), key)?.is_some())
    }

    /// Forward cursor from the smallest key >= `from`
    pub fn iter_raw_from<'a>(&'a self, cf: &str, from: &[u8]) -> DBIterator<'a> {
        self.database
            .iterator_cf(self.cf(cf), IteratorMode::From(from, speedb::Direction::Forward))
    }

    pub fn iter_raw<'a>(&'a self, cf: &str) -> DBIterator<'a> {
        self.database.iterator_cf(self.cf(cf), IteratorMode::Start)
    }

    /// Number of keys in a map (full scan)
    pub fn len_raw(&self, cf: &str) -> usize {
        self.iter_raw(cf).flatten().count()
    }

    /// Flush WAL and memtables of every column family
    pub fn sync(&self) -> Result<()> {
        for cf in Self::COLUMN_FAMILIES {
            self.database.flush_cf(self.cf(cf))?;
        }
        Ok(())
    }
}

pub fn to_be_bytes(value: u32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn from_be_bytes(bytes: Vec<u8>) -> u32 {
    const SIZE: usize = (u32::BITS / 8) as usize;
    let mut be_bytes = [0; SIZE];

    be_bytes[..SIZE].copy_from_slice(&bytes[..SIZE]);
    u32::from_be_bytes(be_bytes)
}
