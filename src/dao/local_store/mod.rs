mod file;
mod memory;

pub use self::file::FileStore;
pub use self::memory::MemoryStore;

use serde::{Serialize, de::DeserializeOwned};

use crate::dao::storage::{StorageError, StorageResult};

/// Synchronous string key/value storage with browser local-storage semantics.
///
/// Writes replace the whole value; there are no partial merges.
pub trait LocalStore: Send + Sync {
    /// Value under `key`, if any.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    /// Replace the value under `key`.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Delete `key`; missing keys are not an error.
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Read and decode a JSON value.
pub fn load_json<T>(store: &dyn LocalStore, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(raw) = store.get_item(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Encode and write a JSON value.
pub fn save_json<T>(store: &dyn LocalStore, key: &str, value: &T) -> StorageResult<()>
where
    T: ?Sized + Serialize,
{
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set_item(key, &raw)
}
