//! Client-held catalog of uploaded files and its filtered, sorted views.

pub mod projection;
pub mod remote;
pub mod view;

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::CatalogError;
use crate::storage::retry::{with_retry_if, RetryConfig};
use crate::{is_supported, DroppedFile, FileTypeDetector};

pub use projection::{project, ProjectionCache};
pub use remote::{FileStorageApi, HttpFileStorage};
pub use view::{SortDirection, SortKey, ViewState};

/// A file offered for upload.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadCandidate {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data: data.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CatalogError::InvalidName(path.display().to_string()))?
            .to_string();
        let data = fs::read(path).await?;
        Ok(Self::new(name, data))
    }
}

/// Outcome of an upload batch. A name in `failed` also appears in `accepted`
/// when the local record was added before the remote upload failed.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub failed: Vec<(String, CatalogError)>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }
}

pub struct FileCatalog<A> {
    api: A,
    retry: RetryConfig,
    files: RwLock<Vec<DroppedFile>>,
    revision: AtomicU64,
    refreshing: AtomicBool,
    projections: ProjectionCache,
}

/// Clears the busy flag however the refresh ends.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: FileStorageApi> FileCatalog<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            retry: RetryConfig::default(),
            files: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
            projections: ProjectionCache::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_projection_cache(mut self, capacity: usize) -> Self {
        self.projections = ProjectionCache::new(capacity);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Bumped on every change to the base list.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub async fn files(&self) -> Vec<DroppedFile> {
        self.files.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    /// Replaces the local list with the remote one. Fails with
    /// `CatalogError::Busy` while another refresh is in flight.
    pub async fn refresh(&self) -> Result<usize, CatalogError> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return Err(CatalogError::Busy);
        }
        let _guard = RefreshGuard(&self.refreshing);

        let fetched = self.remote(|| self.api.list_files())
            .await
            .inspect_err(|e| error!(error = %e, "failed to fetch uploaded files"))?;

        let count = fetched.len();
        self.replace_files(|files| *files = fetched).await;
        debug!(count, "catalog refreshed");
        Ok(count)
    }

    /// Uploads a batch. Unsupported files are rejected individually and the
    /// rest of the batch continues. Accepted files are added locally before
    /// the remote upload, and stay even if that upload fails.
    pub async fn upload(&self, batch: Vec<UploadCandidate>) -> UploadReport {
        let mut report = UploadReport::default();
        let uploaded_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        for candidate in batch {
            if !is_supported(&candidate.name) {
                warn!(file = %candidate.name, "unsupported file type rejected");
                report.rejected.push(candidate.name);
                continue;
            }

            let mime_type = candidate
                .mime_type
                .unwrap_or_else(|| FileTypeDetector::detect(&candidate.name, &candidate.data));
            let content = match String::from_utf8(candidate.data) {
                Ok(content) => content,
                Err(_) => {
                    let err = CatalogError::InvalidContent(candidate.name.clone());
                    warn!(error = %err, "upload skipped");
                    report.failed.push((candidate.name, err));
                    continue;
                }
            };

            let record = DroppedFile::new(candidate.name.clone(), mime_type, content.clone())
                .uploaded_at(uploaded_at.clone());
            self.replace_files(|files| files.push(record)).await;
            report.accepted.push(candidate.name.clone());

            let upload = self.remote(|| self.api.upload(&candidate.name, &content)).await;
            if let Err(e) = upload {
                error!(file = %candidate.name, error = %e, "upload failed, local record kept");
                report.failed.push((candidate.name, e));
            }
        }

        info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "upload batch finished"
        );
        report
    }

    /// Replaces `old_name` with `new_name`/`new_content`, remotely by delete
    /// then re-upload. If the re-upload fails the original is uploaded again
    /// before the error is returned. Renaming onto another existing file is
    /// refused before anything is sent.
    pub async fn edit(&self, old_name: &str, new_name: &str, new_content: &str) -> Result<DroppedFile, CatalogError> {
        if !is_supported(new_name) {
            return Err(CatalogError::UploadRejected(new_name.to_string()));
        }

        let original = self
            .files
            .read()
            .await
            .iter()
            .find(|f| f.name == old_name)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(old_name.to_string()))?;

        if old_name != new_name && self.files.read().await.iter().any(|f| f.name == new_name) {
            return Err(CatalogError::NameTaken(new_name.to_string()));
        }

        if old_name != new_name {
            self.remote(|| self.api.delete(old_name)).await?;
        }

        if let Err(upload_err) = self.remote(|| self.api.upload(new_name, new_content)).await {
            if old_name == new_name {
                return Err(upload_err);
            }
            warn!(file = %old_name, error = %upload_err, "re-upload failed, restoring original");
            return match self.remote(|| self.api.upload(old_name, &original.content)).await {
                Ok(()) => Err(upload_err),
                Err(restore_err) => {
                    error!(file = %old_name, error = %restore_err, "restore failed, file lost remotely");
                    Err(CatalogError::RenameLost {
                        name: old_name.to_string(),
                        message: restore_err.to_string(),
                    })
                }
            };
        }

        let mut updated = original;
        updated.name = new_name.to_string();
        updated.content = new_content.to_string();
        let replacement = updated.clone();
        self.replace_files(|files| {
            if let Some(file) = files.iter_mut().find(|f| f.name == old_name) {
                *file = replacement;
            }
        })
        .await;

        info!(from = %old_name, to = %new_name, "file updated");
        Ok(updated)
    }

    /// Deletes remotely, then drops the first local record named `name`.
    /// Returns whether a local record was removed.
    pub async fn delete(&self, name: &str) -> Result<bool, CatalogError> {
        self.remote(|| self.api.delete(name)).await?;

        let mut removed = false;
        self.replace_files(|files| {
            if let Some(index) = files.iter().position(|f| f.name == name) {
                files.remove(index);
                removed = true;
            }
        })
        .await;

        info!(file = %name, removed, "file deleted");
        Ok(removed)
    }

    /// Memoized projection of the current list through `view`.
    pub async fn projected(&self, view: &ViewState) -> Arc<Vec<DroppedFile>> {
        let files = self.files.read().await;
        let revision = self.revision();
        self.projections.get_or_project(revision, view, &files).await
    }

    pub fn projection_cache(&self) -> &ProjectionCache {
        &self.projections
    }

    /// Runs a remote call under the retry policy. Refusals are returned at once.
    async fn remote<T, F, Fut>(&self, operation: F) -> Result<T, CatalogError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        with_retry_if(&self.retry, CatalogError::is_retryable, operation).await
    }

        async fn replace_files<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<DroppedFile>),
    {
        let mut files = self.files.write().await;
        f(&mut files);
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        drop(files);
        self.projections.retain_revision(revision).await;
    }
}
