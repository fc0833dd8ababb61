//! Key/value persistence for menudesk.
//!
//! The session layer only needs a tiny storage contract: read a string by
//! key, write it, remove it. This crate defines that contract as the
//! [`KeyValueStore`] trait and ships two implementations:
//!
//! - [`MemoryStore`]: process-local map, used in tests and for ephemeral
//!   sessions that must not outlive the process
//! - [`FileStore`]: a single JSON document on disk, rewritten through a
//!   temp file + rename so multi-key updates land together

mod error;
mod file_store;
mod memory_store;

pub use error::{StorageError, StorageResult};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;

/// Minimal string key/value storage contract.
///
/// Implementations must be safe to share across tasks. `set_many` and
/// `remove_many` default to looping over the single-key operations; stores
/// that can commit several keys in one write should override them.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}
