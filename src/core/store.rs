//! Cached storage engine
//!
//! `Store` maps logical keys to files below a base directory and keeps two
//! pieces of in-memory state in lock-step with the disk:
//!
//! - a byte-bounded LRU cache of decompressed payloads (write-through: writes
//!   and erases drop the entry, reads repopulate it)
//! - an optional ordered index of every key present on disk
//!
//! Both are keyed by the canonical key (see [`KeyTransform::canonical`]), so
//! `"a"` and `"a.yaml"` share one file, one cache slot and one index entry.
//!
//! # Concurrency
//!
//! All operations take `&self`. Mutations hold the store lock exclusively and
//! reads hold it shared, so a read can never put bytes older than the latest
//! write or erase back into the cache. Concurrent writes to the same key are
//! last-writer-wins.

use crate::cache::{CacheStats, RecordCache};
use crate::compression::{compress, decompress};
use crate::config::StoreOptions;
use crate::disk::DiskBackend;
use crate::error::{Result, StoreError};
use crate::index::{LessFn, OrderedIndex};
use crate::transform::KeyTransform;
use crate::walk::KeyStream;
use parking_lot::{Mutex, RwLock};
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Extension used when the store is opened without a codec
pub const DEFAULT_EXTENSION: &str = ".yaml";

/// Disk-backed key-value storage engine
pub struct Store {
    options: StoreOptions,
    transform: KeyTransform,
    disk: DiskBackend,
    cache: Mutex<RecordCache>,
    index: Option<RwLock<OrderedIndex>>,
    lock: RwLock<()>,
}

impl Store {
    /// Open a store with the default `.yaml` extension and the configured sort order
    pub fn open(options: StoreOptions) -> Result<Self> {
        let less = options.sort_order.less_fn();
        Self::open_with(options, DEFAULT_EXTENSION, less)
    }

    /// Open a store with an explicit extension and key comparator
    ///
    /// The comparator is only used when `options.sort_keys` is set. The index
    /// is filled from the keys already on disk.
    pub fn open_with(options: StoreOptions, extension: &str, less: LessFn) -> Result<Self> {
        options.validate()?;
        info!(
            "Opening store at {:?} (cache {} bytes, compression {:?}, sorted {})",
            options.base_path, options.cache_size_max, options.compression, options.sort_keys
        );

        let transform = KeyTransform::new(options.append_extension, extension);
        let disk = DiskBackend::new(
            options.base_path.clone(),
            options.temp_dir.clone(),
            options.permissions.path,
            options.permissions.file,
            options.sync_writes,
        );

        let index = if options.sort_keys {
            let mut index = OrderedIndex::new(less);
            let existing = KeyStream::spawn(
                options.base_path.clone(),
                transform.clone(),
                String::new(),
            )?
            .collect::<Result<Vec<String>>>()?;
            debug!("Indexed {} existing keys", existing.len());
            index.initialize(existing);
            Some(RwLock::new(index))
        } else {
            None
        };

        Ok(Store {
            cache: Mutex::new(RecordCache::new(options.cache_size_max)),
            options,
            transform,
            disk,
            index,
            lock: RwLock::new(()),
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn base_path(&self) -> &Path {
        self.disk.base()
    }

    pub fn transform(&self) -> &KeyTransform {
        &self.transform
    }

    /// Canonical form of a key, as reported by enumeration
    pub fn canonical_key(&self, key: &str) -> Result<String> {
        self.transform.canonical(key)
    }

    /// Write bytes under a key, replacing any previous value
    pub fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let pk = self.transform.to_path(key)?;
        let canonical = self.transform.from_path(&pk);
        debug!("Writing {} bytes to {}", data.len(), canonical);

        let stored = compress(data, self.options.compression)?;

        let _guard = self.lock.write();
        self.cache.lock().remove(&canonical);
        let written = self.disk.write(&pk, &stored);
        if let Some(index) = &self.index {
            // A failed direct write can leave a truncated file behind
            if written.is_ok() || self.disk.has(&pk) {
                index.write().insert(&canonical);
            }
        }
        written
    }

    /// Write everything a reader yields under a key
    pub fn write_stream<R: Read>(&self, key: &str, mut reader: R) -> Result<()> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.write(key, &data)
    }

    /// Read the bytes stored under a key
    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        let pk = self.transform.to_path(key)?;
        let canonical = self.transform.from_path(&pk);

        let _guard = self.lock.read();
        if let Some(data) = self.cache.lock().get(&canonical) {
            trace!("Cache hit for {}", canonical);
            return Ok(data.as_ref().clone());
        }

        trace!("Cache miss for {}", canonical);
        let raw = self
            .disk
            .read(&pk)
            .map_err(|e| not_found_or_io(key, e))?;
        let data = decompress(&raw, self.options.compression)?;
        debug!("Read {} bytes from {}", data.len(), canonical);

        if self.options.cache_size_max > 0 {
            self.cache.lock().put(&canonical, Arc::new(data.clone()));
        }
        Ok(data)
    }

    /// Remove a key; fails with `NotFound` if it doesn't exist
    pub fn erase(&self, key: &str) -> Result<()> {
        let pk = self.transform.to_path(key)?;
        let canonical = self.transform.from_path(&pk);
        debug!("Erasing {}", canonical);

        let _guard = self.lock.write();
        self.disk
            .erase(&pk)
            .map_err(|e| not_found_or_io(key, e))?;
        self.cache.lock().remove(&canonical);
        if let Some(index) = &self.index {
            index.write().delete(&canonical);
        }
        Ok(())
    }

    /// Remove everything below the base path
    ///
    /// This deletes *any* file found there, including ones not written through
    /// this store.
    pub fn erase_all(&self) -> Result<()> {
        info!("Erasing everything under {:?}", self.disk.base());

        let _guard = self.lock.write();
        self.disk.erase_all()?;
        self.cache.lock().clear();
        if let Some(index) = &self.index {
            index.write().clear();
        }
        Ok(())
    }

    /// Whether a value is stored under the key; invalid keys are never present
    pub fn has(&self, key: &str) -> bool {
        let pk = match self.transform.to_path(key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let _guard = self.lock.read();
        if self.cache.lock().contains(&self.transform.from_path(&pk)) {
            return true;
        }
        self.disk.has(&pk)
    }

    /// Lazily enumerate keys starting with `prefix`, in unspecified order
    pub fn keys(&self, prefix: &str) -> Result<KeyStream> {
        KeyStream::spawn(
            self.disk.base().to_path_buf(),
            self.transform.clone(),
            prefix.to_string(),
        )
    }

    /// Keys starting with `prefix` in index order, beginning strictly after `from`
    ///
    /// The index is read `chunk_size` keys at a time; an empty `from` starts at
    /// the first key. Requires `sort_keys`.
    pub fn ordered_keys(&self, prefix: &str, from: &str, chunk_size: usize) -> Result<Vec<String>> {
        let index = self.index.as_ref().ok_or(StoreError::IndexDisabled)?;
        let chunk_size = chunk_size.max(1);

        let mut ordered = Vec::new();
        let mut cursor = from.to_string();
        loop {
            let chunk = index.read().keys(&cursor, chunk_size);
            let last = match chunk.last() {
                Some(last) => last.clone(),
                None => break,
            };
            ordered.extend(chunk.into_iter().filter(|k| k.starts_with(prefix)));
            cursor = last;
        }

        trace!("Ordered keys for prefix '{}': {}", prefix, ordered.len());
        Ok(ordered)
    }

    pub fn is_sorted(&self) -> bool {
        self.index.is_some()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }
}

fn not_found_or_io(key: &str, e: io::Error) -> StoreError {
    if e.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(key.to_string())
    } else {
        StoreError::Io(e)
    }
}
