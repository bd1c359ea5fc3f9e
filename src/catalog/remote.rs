use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::error::CatalogError;
use crate::{DroppedFile, UploadRequest};

/// The file-storage service the catalog mirrors.
#[async_trait]
pub trait FileStorageApi: Send + Sync {
    async fn list_files(&self) -> Result<Vec<DroppedFile>, CatalogError>;
    async fn upload(&self, filename: &str, content: &str) -> Result<(), CatalogError>;
    async fn delete(&self, filename: &str) -> Result<(), CatalogError>;
}

/// `FileStorageApi` over the `/api/files` and `/api/upload` HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpFileStorage {
    client: Client,
    base_url: Url,
}

impl HttpFileStorage {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = Url::parse(base_url).map_err(|e| CatalogError::remote("configure client", e))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::remote("configure client", e))?;
        Ok(Self { client, base_url })
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::remote("build url", format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// 4xx answers are refusals; anything else unsuccessful may be retried.
fn check_status(operation: &str, status: StatusCode) -> Result<(), CatalogError> {
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() {
        Err(CatalogError::Refused {
            operation: operation.to_string(),
            status: status.as_u16(),
        })
    } else {
        Err(CatalogError::remote(operation, format!("server answered {}", status)))
    }
}

#[async_trait]
impl FileStorageApi for HttpFileStorage {
    async fn list_files(&self) -> Result<Vec<DroppedFile>, CatalogError> {
        let url = self.endpoint(&["api", "files"])?;
        debug!(%url, "fetching file list");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CatalogError::remote("fetch files", e))?;
        check_status("fetch files", response.status())?;

        response
            .json::<Vec<DroppedFile>>()
            .await
            .map_err(|e| CatalogError::remote("fetch files", e))
    }

    async fn upload(&self, filename: &str, content: &str) -> Result<(), CatalogError> {
        let url = self.endpoint(&["api", "upload"])?;
        let body = UploadRequest {
            filename: filename.to_string(),
            content: content.to_string(),
        };

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CatalogError::remote(format!("upload {}", filename), e))?;
        check_status(&format!("upload {}", filename), response.status())
    }

    async fn delete(&self, filename: &str) -> Result<(), CatalogError> {
        let url = self.endpoint(&["api", "files", filename])?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| CatalogError::remote(format!("delete {}", filename), e))?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(file = %filename, "already deleted remotely");
            return Ok(());
        }
        check_status(&format!("delete {}", filename), response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_file_names() {
        let storage = HttpFileStorage::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        let url = storage.endpoint(&["api", "files", "my notes #1.txt"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/files/my%20notes%20%231.txt");
    }

    #[test]
    fn client_errors_are_refusals() {
        let refused = check_status("upload a.exe", StatusCode::BAD_REQUEST).unwrap_err();
        assert!(matches!(refused, CatalogError::Refused { status: 400, .. }));
        assert!(!refused.is_retryable());

        let unavailable = check_status("upload a.txt", StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert!(unavailable.is_retryable());

        assert!(check_status("list", StatusCode::OK).is_ok());
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let storage = HttpFileStorage::new("http://localhost:8000/dash", Duration::from_secs(1)).unwrap();
        let url = storage.endpoint(&["api", "upload"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/dash/api/upload");
    }
}
