pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod storage;

mod types;

pub use config::Config;
pub use error::{AccessError, CatalogError, ConfigError, StorageError};
pub use registry::{ReadPolicy, ShareRegistry};
pub use types::*;
