use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::broadcast;

use super::{CHANGE_CAPACITY, KeyValueStore, check_key};
use crate::dao::storage::StorageResult;

/// In-process key/value store shared by every clone of the handle.
#[derive(Clone)]
pub struct MemoryKeyValueStore {
    values: Arc<DashMap<String, Vec<u8>>>,
    changes: Option<broadcast::Sender<String>>,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKeyValueStore {
    /// Store that notifies subscribers of every write.
    pub fn new() -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            values: Arc::new(DashMap::new()),
            changes: Some(changes),
        }
    }

    /// Store without change notifications, as seen from another process.
    pub fn without_notifications() -> Self {
        Self {
            values: Arc::new(DashMap::new()),
            changes: None,
        }
    }

    fn notify(&self, key: &str) {
        if let Some(changes) = &self.changes {
            let _ = changes.send(key.to_string());
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let result = check_key(key).map(|()| self.values.get(key).map(|value| value.clone()));
        Box::pin(async move { result })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let result = check_key(key).map(|()| {
            self.values.insert(key.to_string(), value);
            self.notify(key);
        });
        Box::pin(async move { result })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let result = check_key(key).map(|()| {
            if self.values.remove(key).is_some() {
                self.notify(key);
            }
        });
        Box::pin(async move { result })
    }

    fn changes(&self) -> Option<broadcast::Receiver<String>> {
        self.changes.as_ref().map(broadcast::Sender::subscribe)
    }
}
