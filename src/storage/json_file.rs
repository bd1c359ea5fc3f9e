use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::ShareBackend;
use crate::error::StorageError;
use crate::SharedFile;

pub const SHARE_DB_FILE: &str = "shared-files.json";

/// Stores the collection as one pretty-printed JSON array at `<data-dir>/shared-files.json`.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    data_dir: PathBuf,
    file_path: PathBuf,
}

impl JsonFileBackend {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_owned();
        let file_path = data_dir.join(SHARE_DB_FILE);
        Self { data_dir, file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn init_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Init {
            path: self.file_path.clone(),
            source,
        }
    }

    fn write_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.file_path.clone(),
            source,
        }
    }

    async fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        let tmp_path = self.file_path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &self.file_path).await
    }
}

#[async_trait]
impl ShareBackend for JsonFileBackend {
    async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| self.init_error(e))?;

        match fs::metadata(&self.file_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.file_path.display(), "creating empty share store");
                self.write_atomic("[]").await.map_err(|e| self.init_error(e))
            }
            Err(e) => Err(self.init_error(e)),
        }
    }

    async fn load(&self) -> Result<Vec<SharedFile>, StorageError> {
        self.init().await?;

        let content = fs::read_to_string(&self.file_path)
            .await
            .map_err(|source| StorageError::Read {
                path: self.file_path.clone(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
            path: self.file_path.clone(),
            source,
        })
    }

    async fn save(&self, records: &[SharedFile]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| self.write_error(e))?;

        let json = serde_json::to_string_pretty(records)?;
        self.write_atomic(&json)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!(path = %self.file_path.display(), count = records.len(), "share store written");
        Ok(())
    }
}
