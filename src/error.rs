use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to initialize share store at {path}: {source}")]
    Init {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read share store at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("share store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write share store at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode share records: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Whether the error came from reading the collection, as opposed to creating or writing it.
    pub fn is_read_failure(&self) -> bool {
        matches!(self, StorageError::Read { .. } | StorageError::Corrupt { .. })
    }
}

#[derive(Error, Debug)]
pub enum AccessError {
    #[error("share not found: {0}")]
    NotFound(String),
    #[error("share link expired: {0}")]
    Expired(String),
    #[error("password required for share {0}")]
    PasswordRequired(String),
    #[error("invalid password for share {0}")]
    InvalidPassword(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0} is not a supported file type")]
    UploadRejected(String),
    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },
    #[error("{operation} refused with status {status}")]
    Refused { operation: String, status: u16 },
    #[error("a refresh is already in progress")]
    Busy,
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("a file named {0} already exists")]
    NameTaken(String),
    #[error("file name is not valid UTF-8: {0}")]
    InvalidName(String),
    #[error("{name} was deleted but could not be restored after a failed rename: {message}")]
    RenameLost { name: String, message: String },
    #[error("{0} is not valid UTF-8 text")]
    InvalidContent(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn remote(operation: impl Into<String>, message: impl ToString) -> Self {
        CatalogError::Remote {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Transport failures and server errors may succeed on a later attempt;
    /// a refusal by the server will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Remote { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config file not found: {0}")]
    Missing(PathBuf),
}
