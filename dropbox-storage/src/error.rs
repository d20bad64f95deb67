use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    // Session errors
    #[error("authentication failed: {0}")]
    Authentication(String),

    // Object errors (with the logical path of the object)
    #[error("failed to write `{path}`: {reason}")]
    RemoteWrite { path: String, reason: String },

    #[error("failed to read `{path}`: {reason}")]
    RemoteRead { path: String, reason: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid object path `{0}`")]
    InvalidPath(String),

    // Internal errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

impl StorageError {
    pub fn remote_write(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn remote_read(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::RemoteRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
