//! Key-to-path transform
//!
//! Maps a logical `/`-delimited key to a physical location below the base
//! directory and back:
//!
//! - `"users/1"` -> `PathKey { path: ["users"], file_name: "1.yaml" }`
//! - `"config"` -> `PathKey { path: [], file_name: "config.yaml" }`
//!
//! With `append_extension` enabled, the extension is appended only when the
//! key doesn't already carry it, so `"a"` and `"a.yaml"` resolve to the same
//! file. The inverse keeps the extension: enumerating a store written with key
//! `"a"` yields `"a.yaml"`.

use crate::error::{Result, StoreError};
use std::path::{Path, PathBuf};

/// Separator between key segments
pub const KEY_SEPARATOR: char = '/';

/// Physical location of a key relative to the base path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey {
    /// Directory segments, outermost first
    pub path: Vec<String>,
    /// File name, extension-normalized
    pub file_name: String,
}

impl PathKey {
    /// Directory holding the file
    pub fn dir_in(&self, base: &Path) -> PathBuf {
        let mut dir = base.to_path_buf();
        for segment in &self.path {
            dir.push(segment);
        }
        dir
    }

    /// Full file path
    pub fn file_in(&self, base: &Path) -> PathBuf {
        self.dir_in(base).join(&self.file_name)
    }
}

/// Bidirectional key/path mapping
#[derive(Debug, Clone)]
pub struct KeyTransform {
    append_extension: bool,
    extension: String,
}

impl KeyTransform {
    /// Create a transform; `extension` includes the leading dot (e.g. ".yaml")
    pub fn new(append_extension: bool, extension: impl Into<String>) -> Self {
        KeyTransform {
            append_extension,
            extension: extension.into(),
        }
    }

    pub fn appends_extension(&self) -> bool {
        self.append_extension
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn with_extension(&self, name: &str) -> String {
        if self.append_extension && !name.ends_with(&self.extension) {
            format!("{}{}", name, self.extension)
        } else {
            name.to_string()
        }
    }

    /// Map a logical key to its physical location
    pub fn to_path(&self, key: &str) -> Result<PathKey> {
        if key.is_empty() {
            return Err(StoreError::invalid_key(key, "key cannot be empty"));
        }

        let mut segments: Vec<String> = Vec::new();
        for segment in key.split(KEY_SEPARATOR) {
            match segment {
                "" => {
                    return Err(StoreError::invalid_key(
                        key,
                        "key cannot contain empty segments",
                    ))
                }
                "." | ".." => {
                    return Err(StoreError::invalid_key(
                        key,
                        "relative segments are not allowed",
                    ))
                }
                s if s.contains('\\') => {
                    return Err(StoreError::invalid_key(key, "backslashes are not allowed"))
                }
                s => segments.push(s.to_string()),
            }
        }

        // split() always yields at least one segment and none are empty here
        let file_name = match segments.pop() {
            Some(last) => self.with_extension(&last),
            None => return Err(StoreError::invalid_key(key, "key has no file name")),
        };

        Ok(PathKey {
            path: segments,
            file_name,
        })
    }

    /// Map a physical location back to a logical key
    pub fn from_path(&self, path_key: &PathKey) -> String {
        let file_name = self.with_extension(&path_key.file_name);
        if path_key.path.is_empty() {
            file_name
        } else {
            format!(
                "{}{}{}",
                path_key.path.join("/"),
                KEY_SEPARATOR,
                file_name
            )
        }
    }

    /// Key under which cache and index track `key`
    ///
    /// Both `"a"` and `"a.yaml"` canonicalize to `"a.yaml"` when extensions are
    /// appended, matching what enumeration reports.
    pub fn canonical(&self, key: &str) -> Result<String> {
        Ok(self.from_path(&self.to_path(key)?))
    }
}
