use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::ShareBackend;
use crate::error::StorageError;
use crate::SharedFile;

/// Keeps the collection in memory. Clones share the same collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    records: Arc<Mutex<Vec<SharedFile>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<SharedFile> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl ShareBackend for MemoryBackend {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load(&self) -> Result<Vec<SharedFile>, StorageError> {
        Ok(self.records.lock().await.clone())
    }

    async fn save(&self, records: &[SharedFile]) -> Result<(), StorageError> {
        let mut stored = self.records.lock().await;
        *stored = records.to_vec();
        Ok(())
    }
}
