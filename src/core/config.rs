//! Store configuration
//!
//! [`StoreOptions`] can be built in code or loaded from TOML:
//!
//! ```
//! use yamldb_rs::StoreOptions;
//!
//! let options = StoreOptions::from_toml_str(r#"
//!     base_path = "./data"
//!     append_extension = true
//!     cache_size_max = 1048576
//!     compression = "gzip"
//!     sort_keys = true
//!     sort_order = "descending"
//!
//!     [permissions]
//!     path = 0o750
//!     file = 0o640
//! "#).unwrap();
//!
//! assert!(options.sort_keys);
//! ```

use crate::compression::CompressionMethod;
use crate::error::{Result, StoreError};
use crate::index::SortOrder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default permissions for created directories
pub const DEFAULT_PATH_PERM: u32 = 0o777;

/// Default permissions for created files
pub const DEFAULT_FILE_PERM: u32 = 0o666;

/// Permissions applied to created directories and files (before umask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPermissions {
    pub path: u32,
    pub file: u32,
}

impl Default for DiskPermissions {
    fn default() -> Self {
        DiskPermissions {
            path: DEFAULT_PATH_PERM,
            file: DEFAULT_FILE_PERM,
        }
    }
}

/// Options for opening a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Directory where files are stored
    pub base_path: PathBuf,

    /// Append the codec extension (e.g. `.yaml`) to keys lacking it
    pub append_extension: bool,

    /// Max in-memory cache size in bytes; 0 disables the cache
    pub cache_size_max: u64,

    /// Compression applied to files before they are stored
    pub compression: CompressionMethod,

    pub permissions: DiskPermissions,

    /// Enables atomic writes: files are written here first, then renamed
    /// into the base path. Must be on the same device as `base_path`.
    pub temp_dir: Option<PathBuf>,

    /// Keep an in-memory ordered index of keys
    pub sort_keys: bool,

    /// Order of the index when `sort_keys` is set
    pub sort_order: SortOrder,

    /// fsync every file after writing
    pub sync_writes: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            base_path: PathBuf::from("data"),
            append_extension: true,
            cache_size_max: 0,
            compression: CompressionMethod::None,
            permissions: DiskPermissions::default(),
            temp_dir: None,
            sort_keys: false,
            sort_order: SortOrder::Ascending,
            sync_writes: false,
        }
    }
}

impl StoreOptions {
    /// Default options rooted at `base_path`
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        StoreOptions {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let options: StoreOptions =
            toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(StoreError::Config("base_path cannot be empty".to_string()));
        }
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir == &self.base_path {
                return Err(StoreError::Config(
                    "temp_dir must differ from base_path".to_string(),
                ));
            }
            if temp_dir.starts_with(&self.base_path) {
                return Err(StoreError::Config(
                    "temp_dir cannot live inside base_path".to_string(),
                ));
            }
        }
        Ok(())
    }
}
