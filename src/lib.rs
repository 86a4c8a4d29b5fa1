//! # yamldb - Disk-Backed Store for Human-Readable Records
//!
//! `yamldb-rs` stores serde-serializable records as YAML files under a
//! hierarchical key namespace. Keys like `users/1` become files like
//! `users/1.yaml` below a base directory, so the data stays easy to read,
//! diff and edit by hand. On top of that it provides:
//!
//! - **Bounded caching** of record payloads with write-through invalidation
//! - **Ordered keys** through an optional in-memory index with a custom comparator
//! - **Transparent compression** (zlib, gzip, LZ4, Zstd)
//! - **Atomic writes** through a temp dir on the same device
//! - **Referential constraints** between records ([`Schema`]) with
//!   cascade / restrict / no-action semantics
//!
//! This is not a transactional database: there is no multi-key atomicity and
//! no write-ahead log.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use yamldb_rs::{Result, YamlDbBuilder};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     admin: bool,
//! }
//!
//! # fn main() -> Result<()> {
//! let db = YamlDbBuilder::new()
//!     .base_path("./data")
//!     .cache_size_max(1024 * 1024)
//!     .build()?;
//!
//! db.write("users/1", &User { name: "David".into(), admin: false })?;
//!
//! let user: User = db.update("users/1", |u: &mut User| u.admin = true)?;
//! assert!(user.admin);
//!
//! db.iterate_serialized("users", |u: User| {
//!     println!("{}", u.name);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

// Engine implementation
pub mod core;

// Re-export core modules internally so crate:: paths in core work
pub(crate) use core::{cache, codec, compression, config, disk, error, index, store, transform, walk};

pub use crate::core::{
    cache::CacheStats,
    codec::{Codec, JsonCodec, YamlCodec},
    compression::CompressionMethod,
    config::{DiskPermissions, StoreOptions},
    error::{Result, StoreError},
    index::{order_alphabetically, order_alphabetically_reversed, LessFn, SortOrder},
    schema::{Action, Constraints, Schema, SchemaReference},
    store::Store,
    transform::{KeyTransform, PathKey},
    walk::KeyStream,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Record store: a [`Store`] plus a [`Codec`] at the boundary
///
/// # Examples
///
/// ```rust,no_run
/// use yamldb_rs::{StoreOptions, YamlDb};
///
/// # fn main() -> yamldb_rs::Result<()> {
/// let db = YamlDb::open(StoreOptions::new("./data"))?;
/// db.write("config", &vec!["a", "b"])?;
/// let values: Vec<String> = db.read("config")?;
/// # Ok(())
/// # }
/// ```
pub struct YamlDb<C: Codec = YamlCodec> {
    store: Store,
    codec: C,
}

impl YamlDb<YamlCodec> {
    /// Open a YAML store
    pub fn open(options: StoreOptions) -> Result<Self> {
        Self::open_with_codec(options, YamlCodec)
    }
}

impl<C: Codec> YamlDb<C> {
    /// Open a store using `codec`; its extension is the one appended to keys
    pub fn open_with_codec(options: StoreOptions, codec: C) -> Result<Self> {
        let less = options.sort_order.less_fn();
        let store = Store::open_with(options, codec.extension(), less)?;
        Ok(YamlDb { store, codec })
    }

    /// Serialize a value and store it under `key`
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let data = self.codec.encode(value)?;
        self.store.write(key, &data)
    }

    /// Store already-encoded bytes
    pub fn write_raw(&self, key: &str, data: &[u8]) -> Result<()> {
        self.store.write(key, data)
    }

    fn read_with<T: DeserializeOwned>(&self, key: &str, strict: bool) -> Result<T> {
        let data = self.store.read(key)?;
        self.codec.decode(&data, strict)
    }

    /// Read and deserialize a record, ignoring unknown fields
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.read_with(key, false)
    }

    /// Read and deserialize a record, failing with `UnknownFields` on fields `T` lacks
    pub fn read_strict<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.read_with(key, true)
    }

    /// Read the stored bytes
    pub fn read_raw(&self, key: &str) -> Result<Vec<u8>> {
        self.store.read(key)
    }

    /// Remove a record
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.erase(key)
    }

    /// Read a record, apply `f`, and write it back
    ///
    /// Not atomic: a write to the same key between the read and the write is
    /// silently overwritten. Serialize callers if that matters.
    pub fn update<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut value: T = self.read(key)?;
        f(&mut value);
        self.write(key, &value)?;
        Ok(value)
    }

    /// Whether a record is stored under `key`; invalid keys are never present
    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }

    /// Remove every record whose key starts with `prefix`. Cannot be undone!
    pub fn purge(&self, prefix: &str) -> Result<()> {
        debug!("Purging prefix '{}'", prefix);
        for key in self.store.keys(prefix)? {
            self.store.erase(&key?)?;
        }
        Ok(())
    }

    /// Remove all data, including files not written through this store. Cannot be undone!
    pub fn purge_all(&self) -> Result<()> {
        self.store.erase_all()
    }

    /// Call `callback` with the raw bytes of every record under `prefix`
    ///
    /// Returns whether any record matched. The first error from reading or
    /// from the callback stops the walk and is returned.
    pub fn iterate<F>(&self, prefix: &str, mut callback: F) -> Result<bool>
    where
        F: FnMut(&str, &[u8]) -> Result<()>,
    {
        let mut found = false;
        for key in self.store.keys(prefix)? {
            let key = key?;
            found = true;
            let data = self.store.read(&key)?;
            callback(&key, &data)?;
        }
        Ok(found)
    }

    /// Like [`iterate`](Self::iterate), deserializing each record leniently first
    pub fn iterate_serialized<T, F>(&self, prefix: &str, mut callback: F) -> Result<bool>
    where
        T: DeserializeOwned,
        F: FnMut(T) -> Result<()>,
    {
        self.iterate(prefix, |_, data| callback(self.codec.decode(data, false)?))
    }

    /// Lazily enumerate keys under `prefix`; drop or cancel the stream to stop early
    pub fn keys(&self, prefix: &str) -> Result<KeyStream> {
        self.store.keys(prefix)
    }

    /// Keys under `prefix` in index order, strictly after `from`, fetched `chunks` at a time
    pub fn ordered_keys(&self, prefix: &str, from: &str, chunks: usize) -> Result<Vec<String>> {
        self.store.ordered_keys(prefix, from, chunks)
    }

    /// Underlying storage engine for raw access
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

/// Builder for opening a [`YamlDb`]
///
/// # Examples
///
/// ```rust,no_run
/// use yamldb_rs::{CompressionMethod, YamlDbBuilder};
///
/// # fn main() -> yamldb_rs::Result<()> {
/// let db = YamlDbBuilder::new()
///     .base_path("/var/lib/app/data")
///     .temp_dir("/var/lib/app/tmp")   // atomic writes
///     .compression(CompressionMethod::Gzip)
///     .order_by(|a, b| a.len() < b.len() || (a.len() == b.len() && a < b))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct YamlDbBuilder<C: Codec = YamlCodec> {
    options: StoreOptions,
    less: Option<LessFn>,
    codec: C,
}

impl YamlDbBuilder<YamlCodec> {
    /// Create a builder with default options and the YAML codec
    pub fn new() -> Self {
        YamlDbBuilder {
            options: StoreOptions::default(),
            less: None,
            codec: YamlCodec,
        }
    }
}

impl Default for YamlDbBuilder<YamlCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> YamlDbBuilder<C> {
    /// Replace all options at once (e.g. loaded from TOML)
    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.base_path = path.into();
        self
    }

    /// Whether to append the codec extension to keys lacking it (default: true)
    pub fn append_extension(mut self, append: bool) -> Self {
        self.options.append_extension = append;
        self
    }

    /// Max bytes of cached payloads; 0 disables the cache
    pub fn cache_size_max(mut self, bytes: u64) -> Self {
        self.options.cache_size_max = bytes;
        self
    }

    pub fn compression(mut self, method: CompressionMethod) -> Self {
        self.options.compression = method;
        self
    }

    /// Mode bits for created directories and files
    pub fn permissions(mut self, path: u32, file: u32) -> Self {
        self.options.permissions = DiskPermissions { path, file };
        self
    }

    /// Enable atomic writes through `dir` (same device as the base path)
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.options.temp_dir = Some(dir.into());
        self
    }

    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.options.sync_writes = sync;
        self
    }

    /// Keep keys sorted in one of the built-in orders
    pub fn sort_keys(mut self, order: SortOrder) -> Self {
        self.options.sort_keys = true;
        self.options.sort_order = order;
        self
    }

    /// Keep keys sorted by a custom "less than" comparator
    pub fn order_by<F>(mut self, less: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        self.options.sort_keys = true;
        self.less = Some(Arc::new(less));
        self
    }

    /// Switch to another codec
    pub fn codec<D: Codec>(self, codec: D) -> YamlDbBuilder<D> {
        YamlDbBuilder {
            options: self.options,
            less: self.less,
            codec,
        }
    }

    /// Open the store
    pub fn build(self) -> Result<YamlDb<C>> {
        let less = self
            .less
            .unwrap_or_else(|| self.options.sort_order.less_fn());
        let store = Store::open_with(self.options, self.codec.extension(), less)?;
        Ok(YamlDb {
            store,
            codec: self.codec,
        })
    }
}
