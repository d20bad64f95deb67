// PathManager maps logical object keys to backend paths.
//
// A key such as `uploads/a.txt` is normalized and placed under the root of
// the backend:
//
//	<root>
//	└── uploads
//	    └── a.txt
//
// For Dropbox the root is a folder of the remote namespace (empty for the
// namespace root, so keys map to `/uploads/a.txt`). For the filesystem
// backend it is a local directory.

use crate::error::{Result, StorageError};

#[derive(Clone, Debug)]
pub struct PathManager {
    root_path: String,
}

impl PathManager {
    pub fn new(root: &str) -> Self {
        PathManager {
            root_path: root.trim_end_matches('/').to_string(),
        }
    }

    /// A manager rooted at `/<prefix>` in a remote namespace, or at the
    /// namespace root when `prefix` is empty.
    pub fn remote(prefix: &str) -> Self {
        let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            Self::new("")
        } else {
            Self::new(&format!("/{}", segments.join("/")))
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Returns the backend path of a single object,
    /// (e.g. `<root>/uploads/a.txt`).
    pub fn object_path(&self, key: &str) -> Result<String> {
        Ok(format!("{}/{}", self.root_path, normalize_key(key)?))
    }
}

/// Drops empty segments and rejects keys that are empty or step outside the
/// root.
pub fn normalize_key(key: &str) -> Result<String> {
    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" => continue,
            "." | ".." => return Err(StorageError::InvalidPath(key.to_string())),
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(StorageError::InvalidPath(key.to_string()));
    }
    Ok(segments.join("/"))
}
