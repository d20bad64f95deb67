use crate::error::Result;
use crate::upload::LocalFile;
use bytes::Bytes;

pub mod driver;
pub mod paths;

/// A handle to one stored object. It holds no content, only the path.
#[async_trait::async_trait]
pub trait StoredFile: Send + Sync {
    fn path(&self) -> &str;
    async fn read(&self) -> Result<Bytes>;
    async fn delete(&self) -> Result<()>;
    async fn url(&self) -> Result<String>;
    async fn store(&self, file: &dyn LocalFile) -> Result<()>;
}

/// A storage backend bound to the target path of the current upload.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn store(&self, file: &dyn LocalFile) -> Result<Box<dyn StoredFile>>;
    fn retrieve(&self) -> Box<dyn StoredFile>;
}
