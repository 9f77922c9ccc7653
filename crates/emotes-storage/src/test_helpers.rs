//! In-memory storage for tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{Storage, StorageBackend, StorageError, StorageResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Mock storage implementation that stores objects in memory
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    fail_uploads: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
    upload_gate: Arc<RwLock<()>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Make every following bulk delete fail
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Park every upload until the returned guard is dropped
    pub async fn hold_uploads(&self) -> OwnedRwLockWriteGuard<()> {
        self.upload_gate.clone().write_owned().await
    }

    pub fn insert(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String> {
        let _gate = self.upload_gate.read().await;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(format!(
                "mock upload failure for {}",
                storage_key
            )));
        }
        self.insert(storage_key, data, content_type);
        Ok(self.public_url(storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.get(storage_key)
            .map(|object| object.data)
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_many(&self, storage_keys: &[String]) -> StorageResult<usize> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed("mock delete failure".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        Ok(storage_keys
            .iter()
            .filter(|key| objects.remove(key.as_str()).is_some())
            .count())
    }

    fn public_url(&self, storage_key: &str) -> String {
        format!("https://cdn.example.com/{}", storage_key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_storage_failure_switches() {
        let storage = MockStorage::new();
        storage
            .upload_with_key("emote/a/1x", vec![1], "image/png")
            .await
            .unwrap();

        storage.fail_deletes(true);
        assert!(storage
            .delete_many(&["emote/a/1x".to_string()])
            .await
            .is_err());
        assert_eq!(storage.keys(), vec!["emote/a/1x".to_string()]);

        storage.fail_uploads(true);
        assert!(storage
            .upload_with_key("emote/a/2x", vec![2], "image/png")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_held_uploads_wait_for_release() {
        let storage = MockStorage::new();
        let gate = storage.hold_uploads().await;

        let pending = tokio::spawn({
            let storage = storage.clone();
            async move { storage.upload_with_key("emote/a/1x", vec![1], "image/png").await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(storage.keys().is_empty());

        drop(gate);
        pending.await.unwrap().unwrap();
        assert_eq!(storage.keys(), vec!["emote/a/1x".to_string()]);
    }
}
