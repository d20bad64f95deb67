//! Storage adapters for upload pipelines.
//!
//! A pipeline hands a backend an [`UploadContext`] naming the target path of
//! the current file and gets back [`StoredFile`] handles. Backends:
//! - [`DropboxStorage`]: a Dropbox account over its HTTP API
//! - [`FileStorage`]: a local directory

pub mod error;
pub mod storage;
pub mod upload;

pub use error::{Result, StorageError};
pub use storage::driver::dropbox::{
    AccessPolicy, AccountInfo, DropboxConfig, DropboxFile, DropboxStorage,
};
pub use storage::driver::filesystem::{FileStorage, FilesystemFile};
pub use storage::{Storage, StoredFile};
pub use upload::{LocalFile, UploadContext, UploadTarget};
