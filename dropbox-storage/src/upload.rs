//! Inputs handed to a storage backend by the upload pipeline.
//!
//! An [`UploadContext`] names where the current file lives in the backend's
//! namespace, a [`LocalFile`] supplies the bytes that go there.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

/// Supplies the target path of the file currently being processed.
pub trait UploadContext: Send + Sync {
    fn target_path(&self) -> String;
}

/// A context with a fixed target path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadTarget {
    path: String,
}

impl UploadTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl UploadContext for UploadTarget {
    fn target_path(&self) -> String {
        self.path.clone()
    }
}

/// Content to push to a backend. The whole payload is loaded before transfer.
#[async_trait]
pub trait LocalFile: Send + Sync {
    async fn local_content(&self) -> Result<Bytes>;
}

#[async_trait]
impl LocalFile for PathBuf {
    async fn local_content(&self) -> Result<Bytes> {
        let data = tokio::fs::read(self).await?;
        Ok(Bytes::from(data))
    }
}

#[async_trait]
impl LocalFile for Bytes {
    async fn local_content(&self) -> Result<Bytes> {
        Ok(self.clone())
    }
}

#[async_trait]
impl LocalFile for Vec<u8> {
    async fn local_content(&self) -> Result<Bytes> {
        Ok(Bytes::copy_from_slice(self))
    }
}
