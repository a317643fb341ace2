mod file;
mod memory;

use futures::future::BoxFuture;
use tokio::sync::broadcast;

use crate::dao::storage::{StorageError, StorageResult};

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Capacity of the change-notification channel of a backend.
const CHANGE_CAPACITY: usize = 64;

/// Device-local key/value storage.
///
/// Values are opaque bytes. Backends that can observe writes made through any
/// handle sharing their storage domain expose them through [`KeyValueStore::changes`].
pub trait KeyValueStore: Send + Sync {
    /// Bytes stored under `key`, `None` when absent.
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>>;
    /// Replace the value under `key`.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete `key`; deleting a missing key succeeds.
    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// Keys written or removed from now on, or `None` when the backend cannot notify.
    fn changes(&self) -> Option<broadcast::Receiver<String>>;
}

/// Keys double as file names, so only a conservative charset is allowed.
fn check_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_charset_is_enforced() {
        assert!(check_key("match-state.abc123").is_ok());
        assert!(check_key("active-match").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key(".hidden").is_err());
        assert!(check_key("../escape").is_err());
        assert!(check_key("a/b").is_err());
    }
}
