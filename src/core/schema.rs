//! Versioned record envelopes with referential constraints
//!
//! A [`Schema`] wraps a record with a version number, its own key and a list
//! of references to other records. Each reference carries SQL-style actions
//! that fire when the referencing record is deleted or re-keyed:
//!
//! | action      | on delete                            | on update            |
//! |-------------|--------------------------------------|----------------------|
//! | `Cascade`   | delete the referenced record too     | blocked (see below)  |
//! | `Restrict`  | fail with `DeleteRestricted`         | `UpdateRestricted`   |
//! | `NoAction`  | leave the referenced record alone    | proceed              |
//!
//! References are resolved eagerly, in list order, with no locking across
//! records. A delete that cascades through the first reference and then hits
//! a `Restrict` on the second leaves the first referenced record deleted;
//! inspect the store to see how far a cascade got.
//!
//! `Cascade` on update behaves like `Restrict`: rewriting the foreign key
//! held by the referencing side would need a back-link from the referenced
//! record, which envelopes don't track.
//!
//! `Schema::key` must equal the key the envelope is stored under. This is not
//! checked; [`Schema::save`] and [`Schema::load`] keep the two in sync.

use crate::codec::Codec;
use crate::error::{Result, StoreError};
use crate::YamlDb;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// What happens to a referenced record when the referencing one changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    /// Propagate the change to the referenced record
    #[serde(rename = "cascade")]
    Cascade,
    /// Refuse the change while the referenced record exists
    #[serde(rename = "restrict")]
    Restrict,
    /// Leave the referenced record untouched
    #[default]
    #[serde(rename = "no action")]
    NoAction,
}

/// Actions triggered on a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Triggered when the referencing record is re-keyed
    pub on_update: Action,
    /// Triggered when the referencing record is deleted
    pub on_delete: Action,
}

impl Constraints {
    pub fn new(on_update: Action, on_delete: Action) -> Self {
        Constraints {
            on_update,
            on_delete,
        }
    }
}

/// Link to another record in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    /// Key of the referenced record
    pub key: String,
    #[serde(default)]
    pub constraints: Constraints,
}

/// Versioned record that can reference other records. Think of it like a row
/// in an SQL table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema<T> {
    /// Bump when the shape of `data` changes, then migrate on load
    #[serde(default)]
    pub version: u32,

    /// Key the envelope is stored under; other records reference it by this key
    pub key: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<SchemaReference>,

    pub data: T,
}

/// Just enough of a stored envelope to follow its references
#[derive(Deserialize)]
struct Envelope {
    #[allow(dead_code)]
    key: String,
    #[serde(default)]
    references: Vec<SchemaReference>,
}

impl<T> Schema<T> {
    pub fn new(key: impl Into<String>, data: T) -> Self {
        Schema {
            version: 0,
            key: key.into(),
            references: Vec::new(),
            data,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_reference(mut self, key: impl Into<String>, constraints: Constraints) -> Self {
        self.references.push(SchemaReference {
            key: key.into(),
            constraints,
        });
        self
    }

    /// Delete this record, applying each reference's delete action first
    ///
    /// Cascades recurse into referenced envelopes; a referenced record that
    /// isn't an envelope is deleted as a plain record. A record already being
    /// deleted by this call is never revisited, so reference cycles end.
    /// Deleting a record that's already gone is not an error.
    pub fn delete<C: Codec>(&self, db: &YamlDb<C>) -> Result<()> {
        let mut visiting = HashSet::new();
        delete_cascading(db, &self.key, &self.references, &mut visiting)
    }
}

impl<T: Serialize> Schema<T> {
    /// Persist the envelope under its own key
    pub fn save<C: Codec>(&self, db: &YamlDb<C>) -> Result<()> {
        db.write(&self.key, self)
    }
}

impl<T: Serialize + DeserializeOwned> Schema<T> {
    pub fn load<C: Codec>(db: &YamlDb<C>, key: &str) -> Result<Self> {
        db.read(key)
    }

    /// Move the stored record to `new_key`, applying each reference's update action first
    ///
    /// Every reference must exist (`ReferenceNotFound` otherwise) and resolve
    /// to `NoAction` (`UpdateRestricted` otherwise). The stored envelope is
    /// then re-read, given `new_key`, passed to `on_update`, written under
    /// `new_key` and removed from its old key. Not atomic: a concurrent writer
    /// between the read and the write loses.
    pub fn update<C, F>(&self, db: &YamlDb<C>, new_key: &str, on_update: F) -> Result<Schema<T>>
    where
        C: Codec,
        F: FnOnce(&mut Schema<T>),
    {
        for reference in &self.references {
            if !db.has(&reference.key) {
                return Err(StoreError::ReferenceNotFound {
                    key: self.key.clone(),
                    reference: reference.key.clone(),
                });
            }
            match reference.constraints.on_update {
                Action::Cascade | Action::Restrict => {
                    return Err(StoreError::UpdateRestricted {
                        key: self.key.clone(),
                        reference: reference.key.clone(),
                    })
                }
                Action::NoAction => {}
            }
        }

        debug!("Moving schema {} to {}", self.key, new_key);
        let mut stored: Schema<T> = db.read(&self.key)?;
        stored.key = new_key.to_string();
        on_update(&mut stored);
        db.write(new_key, &stored)?;

        if canonical(db, &self.key) != canonical(db, new_key) {
            db.delete(&self.key)?;
        }
        Ok(stored)
    }
}

fn canonical<C: Codec>(db: &YamlDb<C>, key: &str) -> String {
    db.store()
        .canonical_key(key)
        .unwrap_or_else(|_| key.to_string())
}

fn delete_cascading<C: Codec>(
    db: &YamlDb<C>,
    key: &str,
    references: &[SchemaReference],
    visiting: &mut HashSet<String>,
) -> Result<()> {
    visiting.insert(canonical(db, key));

    for reference in references {
        if visiting.contains(&canonical(db, &reference.key)) || !db.has(&reference.key) {
            continue;
        }

        match reference.constraints.on_delete {
            Action::Cascade => {
                debug!("Cascading delete from {} to {}", key, reference.key);
                let nested = match db.read::<Envelope>(&reference.key) {
                    Ok(envelope) => envelope.references,
                    Err(e) if e.is_decode() => Vec::new(),
                    Err(e) => return Err(e),
                };
                delete_cascading(db, &reference.key, &nested, visiting)?;
            }
            Action::Restrict => {
                return Err(StoreError::DeleteRestricted {
                    key: key.to_string(),
                    reference: reference.key.clone(),
                })
            }
            Action::NoAction => {}
        }
    }

    if db.has(key) {
        db.delete(key)?;
    }
    Ok(())
}
