//! In-memory blob store for tests and local runs.

use crate::error::AppError;
use crate::storage::BlobStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Objects keyed by (bucket, path).
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
    uploads: Arc<AtomicUsize>,
}

type ObjectMap = HashMap<(String, String), StoredObject>;

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ObjectMap>, AppError> {
        self.objects
            .lock()
            .map_err(|_| AppError::Storage("memory store poisoned".to_string()))
    }

    /// Seed an object directly (not counted as an upload).
    pub fn put(
        &self,
        bucket: &str,
        object: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.lock()?.insert(
            (bucket.to_string(), object.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    pub fn get(&self, bucket: &str, object: &str) -> Result<Option<StoredObject>, AppError> {
        Ok(self
            .lock()?
            .get(&(bucket.to_string(), object.to_string()))
            .cloned())
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryStorage {
    async fn download_to(&self, bucket: &str, object: &str, dest: &Path) -> Result<(), AppError> {
        let stored = self.get(bucket, object)?.ok_or_else(|| {
            AppError::Storage(format!("No such object: gs://{}/{}", bucket, object))
        })?;
        tokio::fs::write(dest, &stored.bytes).await?;
        Ok(())
    }

    async fn upload_from(
        &self,
        bucket: &str,
        object: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<(), AppError> {
        let bytes = tokio::fs::read(src).await?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.put(bucket, object, bytes, content_type)
    }
}
