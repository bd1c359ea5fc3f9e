pub mod json_file;
pub mod memory;
pub mod retry;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::SharedFile;

pub use json_file::{JsonFileBackend, SHARE_DB_FILE};
pub use memory::MemoryBackend;

/// Persistence handle behind a `ShareRegistry`. Each call moves the whole
/// collection; callers are responsible for serializing writes.
#[async_trait]
pub trait ShareBackend: Send + Sync {
    /// Ensures the collection exists, creating it empty when absent.
    async fn init(&self) -> Result<(), StorageError>;
    async fn load(&self) -> Result<Vec<SharedFile>, StorageError>;
    async fn save(&self, records: &[SharedFile]) -> Result<(), StorageError>;
}
