//! Durable registry of share grants.
//!
//! Every mutation is a full read-modify-write of the collection, executed
//! under one write lock. `tokio::sync::Mutex` hands the lock out in FIFO
//! order, so mutations issued by concurrent tasks run one at a time in the
//! order they queued. Reads do not take the lock.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{AccessError, StorageError};
use crate::storage::{JsonFileBackend, ShareBackend};
use crate::{generate_share_id, NewShare, SharePatch, SharedFile};

/// How reads react to an unreadable or corrupt collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Surface the failure to the caller.
    #[default]
    Strict,
    /// Log it, mark the registry degraded and treat the collection as empty.
    Lenient,
}

pub struct ShareRegistry<B> {
    backend: B,
    read_policy: ReadPolicy,
    write_lock: Mutex<()>,
    degraded: AtomicBool,
}

impl ShareRegistry<JsonFileBackend> {
    /// Registry backed by `<data_dir>/shared-files.json`.
    pub async fn open<P: AsRef<Path>>(data_dir: P, read_policy: ReadPolicy) -> Result<Self, StorageError> {
        let registry = Self::new(JsonFileBackend::new(data_dir)).with_read_policy(read_policy);
        registry.initialize().await?;
        Ok(registry)
    }
}

impl<B: ShareBackend> ShareRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            read_policy: ReadPolicy::default(),
            write_lock: Mutex::new(()),
            degraded: AtomicBool::new(false),
        }
    }

    pub fn with_read_policy(mut self, read_policy: ReadPolicy) -> Self {
        self.read_policy = read_policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True when the last lenient read could not load the collection and returned nothing.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub async fn initialize(&self) -> Result<(), StorageError> {
        self.backend.init().await
    }

    pub async fn list_all(&self) -> Result<Vec<SharedFile>, StorageError> {
        match self.backend.load().await {
            Ok(records) => {
                self.degraded.store(false, Ordering::Relaxed);
                Ok(records)
            }
            Err(e) if e.is_read_failure() && self.read_policy == ReadPolicy::Lenient => {
                warn!(error = %e, "share store unreadable, treating it as empty");
                self.degraded.store(true, Ordering::Relaxed);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<SharedFile>, StorageError> {
        let records = self.list_all().await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    pub async fn create(&self, share: NewShare) -> Result<SharedFile, StorageError> {
        self.mutate(|records| {
            let mut id = generate_share_id();
            while records.iter().any(|r| r.id == id) {
                id = generate_share_id();
            }

            let record = SharedFile::from_new(id, Utc::now(), share);
            records.push(record.clone());
            (record, true)
        })
        .await
        .inspect(|record| {
            info!(id = %record.id, file = %record.original_filename, "share created");
        })
    }

    /// Merges `patch` into the first record with `id`. `None` when no record matches.
    pub async fn update(&self, id: &str, patch: SharePatch) -> Result<Option<SharedFile>, StorageError> {
        self.mutate(|records| match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.apply(patch);
                (Some(record.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    /// Removes the first record with `id`, returning whether anything was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let removed = self
            .mutate(|records| match records.iter().position(|r| r.id == id) {
                Some(index) => {
                    records.remove(index);
                    (true, true)
                }
                None => (false, false),
            })
            .await?;

        if removed {
            info!(%id, "share deleted");
        }
        Ok(removed)
    }

    /// Adds one access to the record with `id`. Unknown ids are ignored.
    pub async fn increment_access_count(&self, id: &str) -> Result<(), StorageError> {
        self.mutate(|records| match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.access_count += 1;
                ((), true)
            }
            None => {
                debug!(%id, "access on unknown share ignored");
                ((), false)
            }
        })
        .await
    }

    pub fn is_expired(&self, record: &SharedFile) -> bool {
        record.is_expired()
    }

    /// Resolves a share link: checks existence, expiry and password, then
    /// counts the access. Check and increment happen under the same lock.
    pub async fn resolve(&self, id: &str, password: Option<&str>) -> Result<SharedFile, AccessError> {
        let now = Utc::now();
        let outcome = self
            .mutate(|records| {
                let Some(record) = records.iter_mut().find(|r| r.id == id) else {
                    return (Err(AccessError::NotFound(id.to_string())), false);
                };
                if record.is_expired_at(now) {
                    return (Err(AccessError::Expired(id.to_string())), false);
                }
                if !record.password_matches(password) {
                    let err = match password {
                        None => AccessError::PasswordRequired(id.to_string()),
                        Some(_) => AccessError::InvalidPassword(id.to_string()),
                    };
                    return (Err(err), false);
                }
                record.access_count += 1;
                (Ok(record.clone()), true)
            })
            .await?;

        match &outcome {
            Ok(record) => debug!(%id, access_count = record.access_count, "share resolved"),
            Err(e) => debug!(%id, error = %e, "share resolution refused"),
        }
        outcome
    }

    /// Serialized read-modify-write. `f` returns its result and whether the
    /// collection changed; unchanged collections are not written back.
    ///
    /// Mutations always load strictly: a collection that cannot be read is
    /// never overwritten, whatever the read policy.
    async fn mutate<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Vec<SharedFile>) -> (T, bool),
    {
        let _guard = self.write_lock.lock().await;

        let mut records = self.backend.load().await?;
        let (result, dirty) = f(&mut records);
        if dirty {
            self.backend.save(&records).await?;
        }
        Ok(result)
    }
}
