//! File-backed key/value store.
//!
//! All keys live in one JSON object. Every mutation rewrites the whole
//! document through `<file>.tmp` followed by a rename, so a crash mid-write
//! leaves either the old or the new document, never a mix of both.

use crate::error::{StorageError, StorageResult};
use crate::KeyValueStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

type Document = BTreeMap<String, String>;

/// [`KeyValueStore`] persisted as a JSON document on disk.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store at the given path. The file is created lazily.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the default document path for `app` under the platform data dir.
    #[must_use]
    pub fn default_path(app: &str) -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(app)
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_document(&self) -> StorageResult<Document> {
        if !self.path.exists() {
            return Ok(Document::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            StorageError::Corrupt(format!("{}: {e}", self.path.display()))
        })
    }

    /// Loads the document for modification. A corrupt document is replaced
    /// rather than blocking every future write.
    fn read_for_update(&self) -> StorageResult<Document> {
        match self.read_document() {
            Err(StorageError::Corrupt(reason)) => {
                warn!("discarding corrupt storage document: {reason}");
                Ok(Document::new())
            }
            other => other,
        }
    }

    fn write_document(&self, document: &Document) -> StorageResult<()> {
        if document.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = document.len(), "storage document written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock();
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.remove_many(&[key])
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        let _guard = self.lock();
        let mut document = self.read_for_update()?;
        for (key, value) in entries {
            document.insert((*key).to_string(), (*value).to_string());
        }
        self.write_document(&document)
    }

    fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        let _guard = self.lock();
        let mut document = self.read_for_update()?;
        for key in keys {
            document.remove(*key);
        }
        self.write_document(&document)
    }
}
