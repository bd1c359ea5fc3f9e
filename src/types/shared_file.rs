use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SHARE_URL_PREFIX: &str = "/shared/";

/// One shareable grant over a file.
///
/// The share URL is not stored: it is always derived from `id`. Collections
/// written by older versions may still carry a `shareUrl` field, which is
/// ignored on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedFile {
    pub id: String,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub is_password_protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub created_by: String,
}

impl SharedFile {
    pub(crate) fn from_new(id: String, created_at: DateTime<Utc>, share: NewShare) -> Self {
        Self {
            id,
            original_filename: share.original_filename,
            created_at,
            expires_at: share.expires_at,
            access_count: 0,
            is_password_protected: share.is_password_protected,
            password: share.password,
            created_by: share.created_by,
        }
    }

    pub fn share_url(&self) -> String {
        share_url_for(&self.id)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }

    /// Checks a supplied password against the stored one. Unprotected grants accept anything.
    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        if !self.is_password_protected {
            return true;
        }
        match (self.password.as_deref(), supplied) {
            (Some(expected), Some(given)) => expected == given,
            (None, _) => true,
            (Some(_), None) => false,
        }
    }

    pub(crate) fn apply(&mut self, patch: SharePatch) {
        if let Some(name) = patch.original_filename {
            self.original_filename = name;
        }
        if let Some(expires_at) = patch.expires_at {
            self.expires_at = expires_at;
        }
        if let Some(password) = patch.password {
            self.is_password_protected = password.is_some();
            self.password = password;
        }
        if let Some(created_by) = patch.created_by {
            self.created_by = created_by;
        }
    }
}

pub fn share_url_for(id: &str) -> String {
    format!("{}{}", SHARE_URL_PREFIX, id)
}

pub(crate) fn generate_share_id() -> String {
    Uuid::new_v4().to_string()
}

/// Caller-supplied fields of a new grant. `id`, `createdAt` and `accessCount` are assigned by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShare {
    pub original_filename: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_password_protected: bool,
    #[serde(default)]
    pub password: Option<String>,
    pub created_by: String,
}

impl NewShare {
    pub fn new(original_filename: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            original_filename: original_filename.into(),
            created_by: created_by.into(),
            ..Default::default()
        }
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.is_password_protected = true;
        self.password = Some(password.into());
        self
    }
}

/// Partial update of a grant. `None` leaves a field untouched; the nested
/// options of `expires_at` and `password` distinguish "set" from "clear".
///
/// The access counter is deliberately absent: it only moves through
/// `ShareRegistry::increment_access_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharePatch {
    pub original_filename: Option<String>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub password: Option<Option<String>>,
    pub created_by: Option<String>,
}

impl SharePatch {
    pub fn is_empty(&self) -> bool {
        self == &SharePatch::default()
    }
}
