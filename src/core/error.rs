//! Error types for store operations
//!
//! Every fallible operation returns [`Result`]. Missing keys surface as
//! [`StoreError::NotFound`] rather than a raw I/O error, and constraint
//! violations name both the record and the reference that blocked it.

use thiserror::Error;

/// Errors returned by the store, its codecs and the constraint engine
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Strict decode failed, unknown fields: {}", .0.join(", "))]
    UnknownFields(Vec<String>),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Can't delete '{key}': reference to '{reference}' is blocked by constraint")]
    DeleteRestricted { key: String, reference: String },

    #[error("Can't update '{key}': reference to '{reference}' is blocked by constraint")]
    UpdateRestricted { key: String, reference: String },

    #[error("Reference '{reference}' of '{key}' not found")]
    ReferenceNotFound { key: String, reference: String },

    #[error("Ordered index is not enabled (set sort_keys)")]
    IndexDisabled,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for `NotFound`, including I/O errors of kind `NotFound`
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// True for either strict or lenient decode failures
    pub fn is_decode(&self) -> bool {
        matches!(self, StoreError::Decode(_) | StoreError::UnknownFields(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
