use std::fmt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, StorageError};
use crate::storage::paths::{PathManager, normalize_key};
use crate::storage::{Storage, StoredFile};
use crate::upload::{LocalFile, UploadContext};

use bytes::Bytes;
use tokio::fs::{self, File, create_dir_all, remove_file};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Stores uploads below a local directory and serves them from `base_url`.
#[derive(Clone)]
pub struct FileStorage {
    path_manager: PathManager,
    base_url: String,
    uploader: Arc<dyn UploadContext>,
}

impl FileStorage {
    pub fn new(root: &str, base_url: &str, uploader: Arc<dyn UploadContext>) -> Self {
        FileStorage {
            path_manager: PathManager::new(root),
            base_url: base_url.trim_end_matches('/').to_string(),
            uploader,
        }
    }

    pub async fn store(&self, file: &dyn LocalFile) -> Result<FilesystemFile> {
        let f = self.retrieve();
        f.store(file).await?;
        Ok(f)
    }

    pub fn retrieve(&self) -> FilesystemFile {
        FilesystemFile {
            storage: self.clone(),
            path: self.uploader.target_path(),
        }
    }

    async fn crate_path(&self, key: &str) -> Result<PathBuf> {
        let file_path = PathBuf::from(self.path_manager.object_path(key)?);
        if let Some(parent) = file_path.parent() {
            create_dir_all(parent).await?;
        }
        Ok(file_path)
    }
}

#[async_trait::async_trait]
impl Storage for FileStorage {
    async fn store(&self, file: &dyn LocalFile) -> Result<Box<dyn StoredFile>> {
        Ok(Box::new(FileStorage::store(self, file).await?))
    }

    fn retrieve(&self) -> Box<dyn StoredFile> {
        Box::new(FileStorage::retrieve(self))
    }
}

pub struct FilesystemFile {
    storage: FileStorage,
    path: String,
}

impl fmt::Debug for FilesystemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesystemFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl StoredFile for FilesystemFile {
    fn path(&self) -> &str {
        &self.path
    }

    async fn read(&self) -> Result<Bytes> {
        let file_path = self.storage.path_manager.object_path(&self.path)?;
        match fs::read(&file_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(self.path.clone()))
            }
            Err(e) => Err(StorageError::remote_read(&self.path, e)),
        }
    }

    async fn delete(&self) -> Result<()> {
        let file_path = self.storage.path_manager.object_path(&self.path)?;
        match remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %self.path, "delete of missing file ignored");
                Ok(())
            }
            Err(e) => Err(StorageError::remote_write(&self.path, e)),
        }
    }

    async fn url(&self) -> Result<String> {
        let file_path = self.storage.path_manager.object_path(&self.path)?;
        match fs::metadata(&file_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(StorageError::remote_read(&self.path, e)),
        }
        Ok(format!(
            "{}/{}",
            self.storage.base_url,
            normalize_key(&self.path)?
        ))
    }

    async fn store(&self, file: &dyn LocalFile) -> Result<()> {
        let data = file.local_content().await?;
        async {
            let file_path = self.storage.crate_path(&self.path).await?;
            let mut file_writer = BufWriter::new(File::create(file_path).await?);
            file_writer.write_all(&data).await?;
            file_writer.flush().await?;
            Ok::<_, StorageError>(())
        }
        .await
        .map_err(|err| match err {
            StorageError::Io(e) => StorageError::remote_write(&self.path, e),
            other => other,
        })?;
        tracing::debug!(path = %self.path, size = data.len(), "stored file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::UploadTarget;

    fn storage_at(root: &std::path::Path, path: &str) -> FileStorage {
        FileStorage::new(
            root.to_str().unwrap(),
            "http://files.local/",
            Arc::new(UploadTarget::new(path)),
        )
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "uploads/a.txt");

        let stored = storage.store(&b"0123456789".to_vec()).await?;
        assert_eq!(stored.path(), "uploads/a.txt");
        assert!(dir.path().join("uploads/a.txt").exists());

        let data = storage.retrieve().read().await?;
        assert_eq!(&data[..], b"0123456789");
        Ok(())
    }

    #[tokio::test]
    async fn store_overwrites_existing_content() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "a.txt");

        storage.store(&b"first version".to_vec()).await?;
        storage.store(&b"second".to_vec()).await?;
        assert_eq!(&storage.retrieve().read().await?[..], b"second");
        Ok(())
    }

    #[tokio::test]
    async fn retrieve_does_not_touch_the_disk() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "missing/file.bin");

        let file = storage.retrieve();
        assert_eq!(file.path(), "missing/file.bin");
        assert!(file.read().await.unwrap_err().is_not_found());
        assert!(file.url().await.unwrap_err().is_not_found());
        Ok(())
    }

    #[tokio::test]
    async fn delete_is_idempotent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "uploads/a.txt");

        let file = storage.store(&b"data".to_vec()).await?;
        file.delete().await?;
        assert!(!dir.path().join("uploads/a.txt").exists());
        file.delete().await?;
        Ok(())
    }

    #[tokio::test]
    async fn url_is_served_from_base_url() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "/uploads//a.txt");

        let file = storage.store(&b"data".to_vec()).await?;
        assert_eq!(file.url().await?, "http://files.local/uploads/a.txt");
        Ok(())
    }

    #[tokio::test]
    async fn url_reports_unreadable_paths_as_remote_read() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        storage_at(dir.path(), "a.txt").store(&b"data".to_vec()).await?;

        // a regular file used as a directory is not a missing object
        let file = storage_at(dir.path(), "a.txt/b.txt").retrieve();
        let err = file.url().await.unwrap_err();
        assert!(matches!(err, StorageError::RemoteRead { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = storage_at(dir.path(), "../outside.txt");

        let err = storage.store(&b"data".to_vec()).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        Ok(())
    }

    #[tokio::test]
    async fn works_behind_the_storage_trait() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage: Arc<dyn Storage> = Arc::new(storage_at(dir.path(), "b.txt"));

        let file = storage.store(&Bytes::from_static(b"hello")).await?;
        assert_eq!(file.path(), "b.txt");
        assert_eq!(&storage.retrieve().read().await?[..], b"hello");
        Ok(())
    }
}
