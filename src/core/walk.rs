//! Lazy, cancellable key enumeration
//!
//! A walker thread traverses the base directory and hands keys to the
//! consumer over a rendezvous channel, so it never runs ahead by more than one
//! key. Calling [`KeyStream::cancel`] or dropping the stream disconnects the
//! cancel channel; the walker observes that before its next directory read or
//! hand-off and exits without producing anything further.

use crate::error::{Result, StoreError};
use crate::transform::{KeyTransform, PathKey, KEY_SEPARATOR};
use crossbeam::channel::{self, select, Receiver, Sender, TryRecvError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::trace;

/// Stream of keys matching a prefix, in unspecified order
pub struct KeyStream {
    keys: Receiver<Result<String>>,
    cancel: Option<Sender<()>>,
    walker: Option<JoinHandle<()>>,
}

impl KeyStream {
    pub(crate) fn spawn(base: PathBuf, transform: KeyTransform, prefix: String) -> Result<Self> {
        let (key_tx, key_rx) = channel::bounded(0);
        let (cancel_tx, cancel_rx) = channel::bounded::<()>(0);

        let walker = Walker {
            transform,
            prefix,
            keys: key_tx,
            cancel: cancel_rx,
        };
        let handle = thread::Builder::new()
            .name("yamldb-keys".to_string())
            .spawn(move || walker.run(&base))?;

        Ok(KeyStream {
            keys: key_rx,
            cancel: Some(cancel_tx),
            walker: Some(handle),
        })
    }

    /// Stop the walk; no further keys are produced
    pub fn cancel(&mut self) {
        if self.cancel.take().is_some() {
            trace!("Key stream cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Iterator for KeyStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_cancelled() {
            return None;
        }
        self.keys.recv().ok()
    }
}

impl Drop for KeyStream {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.walker.take() {
            let _ = handle.join();
        }
    }
}

struct Walker {
    transform: KeyTransform,
    prefix: String,
    keys: Sender<Result<String>>,
    cancel: Receiver<()>,
}

impl Walker {
    fn run(self, base: &Path) {
        trace!("Walking {:?} for prefix '{}'", base, self.prefix);
        let mut pending = vec![(base.to_path_buf(), Vec::<String>::new())];

        while let Some((dir, segments)) = pending.pop() {
            if self.cancelled() {
                return;
            }

            let entries = match read_sorted(&dir) {
                Ok(entries) => entries,
                // Nothing written yet, or pruned by an erase mid-walk
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    if !self.emit(Err(StoreError::Io(e))) {
                        return;
                    }
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for (name, is_dir) in entries {
                if is_dir {
                    let mut child = segments.clone();
                    child.push(name.clone());
                    if self.may_contain_matches(&child) {
                        subdirs.push((dir.join(&name), child));
                    }
                    continue;
                }

                let key = self.transform.from_path(&PathKey {
                    path: segments.clone(),
                    file_name: name,
                });
                if key.starts_with(&self.prefix) && !self.emit(Ok(key)) {
                    return;
                }
            }
            // Reversed so the stack pops subdirectories in name order
            pending.extend(subdirs.into_iter().rev());
        }
        trace!("Walk of {:?} finished", base);
    }

    fn cancelled(&self) -> bool {
        matches!(self.cancel.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Hand one item to the consumer; false once the stream is gone
    fn emit(&self, item: Result<String>) -> bool {
        if self.cancelled() {
            return false;
        }
        select! {
            send(self.keys, item) -> res => res.is_ok(),
            recv(self.cancel) -> _ => false,
        }
    }

    /// Whether keys below this directory can start with the prefix
    fn may_contain_matches(&self, segments: &[String]) -> bool {
        let mut dir_key = segments.join("/");
        dir_key.push(KEY_SEPARATOR);
        dir_key.starts_with(&self.prefix) || self.prefix.starts_with(&dir_key)
    }
}

/// Directory entries as (name, is_dir), sorted by name; non-UTF-8 names are skipped
fn read_sorted(dir: &Path) -> io::Result<Vec<(String, bool)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_dir = entry.file_type()?.is_dir();
        match entry.file_name().into_string() {
            Ok(name) => entries.push((name, is_dir)),
            Err(name) => trace!("Skipping non UTF-8 entry {:?}", name),
        }
    }
    entries.sort();
    Ok(entries)
}
