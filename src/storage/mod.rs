//! Blob storage for original document bytes.
//!
//! The pipeline writes the source PDF before it creates the database record,
//! so a record never exists without its blob.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob name: {0}")]
    InvalidBlobName(String),
}

/// Write-once store for uploaded document bytes.
pub trait BlobStore {
    /// Store `bytes` under `blob_name` and return the resulting URL.
    fn put(&self, blob_name: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Filesystem-backed blob store rooted at a single directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create the store, ensuring the root directory exists.
    pub fn new(root: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, blob_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        // Blob names are generated from UUIDs; reject anything path-like
        if blob_name.is_empty() || blob_name.contains('/') || blob_name.contains("..") {
            return Err(StorageError::InvalidBlobName(blob_name.to_string()));
        }

        let path = self.root.join(blob_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(blob = blob_name, size = bytes.len(), "Blob stored");
        Ok(path.to_string_lossy().into_owned())
    }
}

/// In-memory blob store for tests; optionally fails every write.
#[cfg(test)]
pub struct MockBlobStore {
    pub fail: bool,
}

#[cfg(test)]
impl BlobStore for MockBlobStore {
    fn put(&self, blob_name: &str, _bytes: &[u8]) -> Result<String, StorageError> {
        if self.fail {
            Err(StorageError::Io(std::io::Error::other("simulated outage")))
        } else {
            Ok(format!("mem://{blob_name}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_writes_bytes_and_returns_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let url = store.put("doc-1.pdf", b"%PDF-1.7 test").unwrap();
        assert!(url.ends_with("doc-1.pdf"));
        assert_eq!(std::fs::read(&url).unwrap(), b"%PDF-1.7 test");
    }

    #[test]
    fn new_creates_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("blobs").join("documents");
        assert!(!nested.exists());
        FsBlobStore::new(&nested).unwrap();
        assert!(nested.exists());
    }

    #[test]
    fn rejects_path_traversal_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        assert!(store.put("../escape.pdf", b"x").is_err());
        assert!(store.put("a/b.pdf", b"x").is_err());
        assert!(store.put("", b"x").is_err());
    }

    #[test]
    fn overwrite_is_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        store.put("doc.pdf", b"first").unwrap();
        let url = store.put("doc.pdf", b"second").unwrap();
        assert_eq!(std::fs::read(&url).unwrap(), b"second");
    }
}
