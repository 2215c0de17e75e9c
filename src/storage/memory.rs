use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{BackendError, KeyValueStore};

/// In-process key-value store. Backs `--dry-run`, where commands work on a
/// copy of the stored value and nothing reaches disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the value under `key`, if any, out of another store.
    pub fn copy_of<S: KeyValueStore + ?Sized>(source: &S, key: &str) -> Result<Self, BackendError> {
        let store = Self::new();
        if let Some(value) = source.get(key)? {
            store.set(key, &value)?;
        }
        Ok(store)
    }

    /// Refuse writes, to exercise the persistence failure path.
    #[cfg(test)]
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(format!(
                "memory store is read-only, refusing to write `{key}`"
            )));
        }
        self.entries.lock().insert(key.to_owned(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_of_takes_only_the_requested_key() -> Result<(), BackendError> {
        let source = MemoryStore::new();
        source.set("state", b"blob")?;
        source.set("other", b"ignored")?;

        let copy = MemoryStore::copy_of(&source, "state")?;
        assert_eq!(copy.get("state")?, Some(b"blob".to_vec()));
        assert_eq!(copy.get("other")?, None);

        copy.set("state", b"changed")?;
        assert_eq!(source.get("state")?, Some(b"blob".to_vec()));
        Ok(())
    }

    #[test]
    fn copy_of_missing_key_is_empty() -> Result<(), BackendError> {
        let copy = MemoryStore::copy_of(&MemoryStore::new(), "state")?;
        assert!(copy.is_empty());
        Ok(())
    }
}
