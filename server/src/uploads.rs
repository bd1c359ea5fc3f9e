use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use file_share::{is_supported, DroppedFile, FileTypeDetector};
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum UploadStoreError {
    #[error("invalid file name: {0}")]
    InvalidName(String),
    #[error("{0} is not a supported file type")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Flat directory of uploaded text files, one file per name.
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        let root = root.as_ref().to_owned();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, UploadStoreError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(UploadStoreError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    pub async fn list(&self) -> Result<Vec<DroppedFile>, UploadStoreError> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let data = fs::read(entry.path()).await?;
            let Ok(content) = String::from_utf8(data) else {
                continue;
            };
            let modified: DateTime<Utc> = entry.metadata().await?.modified()?.into();

            let mime_type = FileTypeDetector::detect(&name, content.as_bytes());
            files.push(
                DroppedFile::new(name, mime_type, content)
                    .uploaded_at(modified.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub async fn read(&self, name: &str) -> Result<Option<String>, UploadStoreError> {
        let path = self.path_for(name)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn contains(&self, name: &str) -> Result<bool, UploadStoreError> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    pub async fn save(&self, name: &str, content: &str) -> Result<(), UploadStoreError> {
        let path = self.path_for(name)?;
        if !is_supported(name) {
            return Err(UploadStoreError::Unsupported(name.to_string()));
        }
        fs::write(path, content).await?;
        Ok(())
    }

    /// Returns whether a file was removed.
    pub async fn remove(&self, name: &str) -> Result<bool, UploadStoreError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path()).await.unwrap();
        assert!(matches!(
            store.save("../escape.txt", "x").await,
            Err(UploadStoreError::InvalidName(_))
        ));
        assert!(matches!(store.remove("..").await, Err(UploadStoreError::InvalidName(_))));
    }

    #[tokio::test]
    async fn save_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path()).await.unwrap();
        store.save("b.md", "# b").await.unwrap();
        store.save("a.py", "print(1)").await.unwrap();

        let files = store.list().await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.py", "b.md"]);
        assert_eq!(files[0].mime_type, "text/x-python");
        assert!(files[0].uploaded_at.is_some());

        assert!(store.remove("a.py").await.unwrap());
        assert!(!store.remove("a.py").await.unwrap());
        assert_eq!(store.read("b.md").await.unwrap().as_deref(), Some("# b"));
    }

    #[tokio::test]
    async fn unsupported_extension_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path()).await.unwrap();
        assert!(matches!(
            store.save("tool.exe", "MZ").await,
            Err(UploadStoreError::Unsupported(_))
        ));
    }
}
