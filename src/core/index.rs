//! Ordered key index
//!
//! Keeps every canonical key of the store sorted by a configurable
//! comparator so keys can be walked in order, a chunk at a time, starting
//! strictly after a given key.
//!
//! The comparator is a "less" function `(a, b) -> bool`. Two keys neither of
//! which is less than the other sort next to each other but are still kept
//! as distinct entries.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Strict "less than" comparator over keys
pub type LessFn = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Orders keys from a -> z.
pub fn order_alphabetically(a: &str, b: &str) -> bool {
    a < b
}

/// Orders keys from z -> a.
pub fn order_alphabetically_reversed(a: &str, b: &str) -> bool {
    a > b
}

/// Built-in key orders, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn less_fn(self) -> LessFn {
        match self {
            SortOrder::Ascending => Arc::new(order_alphabetically),
            SortOrder::Descending => Arc::new(order_alphabetically_reversed),
        }
    }
}

/// Sorted set of keys
pub struct OrderedIndex {
    keys: Vec<String>,
    less: LessFn,
}

impl fmt::Debug for OrderedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedIndex")
            .field("len", &self.keys.len())
            .finish()
    }
}

impl OrderedIndex {
    /// Create an empty index with the given comparator
    pub fn new(less: LessFn) -> Self {
        OrderedIndex {
            keys: Vec::new(),
            less,
        }
    }

    /// Replace the contents with `keys`
    pub fn initialize<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.keys = keys.into_iter().collect();
        let less = Arc::clone(&self.less);
        self.keys.sort_by(|a, b| compare(&less, a, b));
        self.keys.dedup();
    }

    fn position(&self, key: &str) -> std::result::Result<usize, usize> {
        // Comparator-equal neighbours are distinct keys; look for an exact match among them
        let start = self.keys.partition_point(|k| (self.less)(k, key));
        let end = start
            + self.keys[start..].partition_point(|k| !(self.less)(key, k));
        match self.keys[start..end].iter().position(|k| k == key) {
            Some(offset) => Ok(start + offset),
            None => Err(end),
        }
    }

    /// Insert a key; returns false if it was already present
    pub fn insert(&mut self, key: &str) -> bool {
        match self.position(key) {
            Ok(_) => false,
            Err(idx) => {
                self.keys.insert(idx, key.to_string());
                true
            }
        }
    }

    /// Remove a key; returns false if it was absent
    pub fn delete(&mut self, key: &str) -> bool {
        match self.position(key) {
            Ok(idx) => {
                self.keys.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_ok()
    }

    /// Up to `n` keys ordered strictly after `from`; an empty `from` starts at the beginning
    ///
    /// A `from` present in the index is an exact cursor, so comparator-equal
    /// neighbours that follow it are still returned. An absent `from` skips
    /// every key the comparator places at or before it.
    pub fn keys(&self, from: &str, n: usize) -> Vec<String> {
        let start = if from.is_empty() {
            0
        } else {
            match self.position(from) {
                Ok(idx) => idx + 1,
                Err(idx) => idx,
            }
        };
        self.keys.iter().skip(start).take(n).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn compare(less: &LessFn, a: &str, b: &str) -> Ordering {
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}
