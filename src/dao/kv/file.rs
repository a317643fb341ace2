use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::{fs, sync::broadcast};
use tracing::debug;

use super::{CHANGE_CAPACITY, KeyValueStore, check_key};
use crate::dao::storage::{StorageError, StorageResult};

/// Key/value store keeping one file per key under a root directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// reader never observes a half-written value. Change notifications only cover
/// writes made through clones of the same handle; other processes sharing the
/// directory are observed by polling.
#[derive(Clone)]
pub struct FileKeyValueStore {
    root: Arc<PathBuf>,
    changes: broadcast::Sender<String>,
}

impl FileKeyValueStore {
    /// Open a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let (changes, _receiver) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            root: Arc::new(root.as_ref().to_path_buf()),
            changes,
        }
    }

    /// Directory holding the values.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Unique per write, so concurrent writers of one key never share a temp file.
    fn temp_path(&self, key: &str) -> PathBuf {
        let suffix: u64 = rand::random();
        self.root.join(format!(".{key}.{suffix:016x}.tmp"))
    }

    fn notify(&self, key: &str) {
        let _ = self.changes.send(key.to_string());
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            check_key(&key)?;
            let path = store.value_path(&key);
            match fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::unavailable(
                    format!("failed to read `{}`", path.display()),
                    err,
                )),
            }
        })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            check_key(&key)?;
            fs::create_dir_all(store.root()).await.map_err(|err| {
                StorageError::unavailable(
                    format!("failed to create `{}`", store.root().display()),
                    err,
                )
            })?;

            let temp = store.temp_path(&key);
            let target = store.value_path(&key);
            fs::write(&temp, &value).await.map_err(|err| {
                StorageError::unavailable(format!("failed to write `{}`", temp.display()), err)
            })?;
            fs::rename(&temp, &target).await.map_err(|err| {
                StorageError::unavailable(format!("failed to replace `{}`", target.display()), err)
            })?;

            debug!(key = %key, bytes = value.len(), "value written");
            store.notify(&key);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move {
            check_key(&key)?;
            let path = store.value_path(&key);
            match fs::remove_file(&path).await {
                Ok(()) => {
                    store.notify(&key);
                    Ok(())
                }
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::unavailable(
                    format!("failed to remove `{}`", path.display()),
                    err,
                )),
            }
        })
    }

    fn changes(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.changes.subscribe())
    }
}
