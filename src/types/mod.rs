mod dropped_file;
mod file;
mod shared_file;

pub use dropped_file::{DroppedFile, UploadRequest};
pub use file::{extension_of, is_supported, FileCategory, FileTypeDetector, SUPPORTED_EXTENSIONS};
pub use shared_file::{share_url_for, NewShare, SharePatch, SharedFile, SHARE_URL_PREFIX};
pub(crate) use shared_file::generate_share_id;
