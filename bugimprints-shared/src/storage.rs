/// Media file storage
///
/// Uploaded bytes are written by a [`MediaStorage`] backend and the returned
/// reference is recorded on the `media` row. Files are content-addressed: the
/// stored name is the SHA-256 of the bytes plus the original extension, so
/// re-uploading the same file reuses the same blob.

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Empty file")]
    Empty,

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Location and size of a stored blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub reference: String,
    pub size: i64,
}

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persists `content` and returns where it went
    async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Bytes,
    ) -> Result<StoredFile, StorageError>;
}

/// Content-addressed name for `content`, keeping the extension of `file_name`
pub fn blob_name(file_name: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", digest, ext.to_ascii_lowercase()),
        None => digest,
    }
}

/// Writes blobs under a directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        content: Bytes,
    ) -> Result<StoredFile, StorageError> {
        if content.is_empty() {
            return Err(StorageError::Empty);
        }

        let name = blob_name(file_name, &content);
        let path = self.root.join(&name);

        tokio::fs::create_dir_all(&self.root).await?;
        if tokio::fs::try_exists(&path).await? {
            debug!(blob = %name, "Blob already stored");
        } else {
            tokio::fs::write(&path, &content).await?;
            debug!(blob = %name, bytes = content.len(), content_type, "Blob written");
        }

        Ok(StoredFile {
            reference: name,
            size: content.len() as i64,
        })
    }
}

/// Keeps blobs in memory; used by tests and throwaway setups
#[derive(Debug, Default)]
pub struct MemoryMediaStorage {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &str) -> Option<Bytes> {
        self.blobs
            .lock()
            .ok()
            .and_then(|blobs| blobs.get(reference).cloned())
    }
}

#[async_trait]
impl MediaStorage for MemoryMediaStorage {
    async fn store(
        &self,
        file_name: &str,
        _content_type: Option<&str>,
        content: Bytes,
    ) -> Result<StoredFile, StorageError> {
        if content.is_empty() {
            return Err(StorageError::Empty);
        }

        let name = blob_name(file_name, &content);
        let size = content.len() as i64;

        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(name.clone(), content);
        }

        Ok(StoredFile { reference: name, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_name_keeps_extension() {
        let name = blob_name("Screenshot.PNG", b"pixels");
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), 64 + 4);

        assert_eq!(blob_name("notes", b"pixels").len(), 64);
        assert_eq!(blob_name("a.png", b"x"), blob_name("b.png", b"x"));
        assert_ne!(blob_name("a.png", b"x"), blob_name("a.png", b"y"));
    }

    #[test]
    fn test_blob_name_ignores_odd_extensions() {
        assert_eq!(blob_name("../../etc/pa ss.w d", b"x").len(), 64);
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryMediaStorage::new();
        let stored = storage.store("log.txt", Some("text/plain"), Bytes::from_static(b"panic")).await.unwrap();

        assert_eq!(stored.size, 5);
        assert_eq!(storage.get(&stored.reference).unwrap(), Bytes::from_static(b"panic"));
        assert!(matches!(
            storage.store("empty.txt", None, Bytes::new()).await,
            Err(StorageError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_local_storage_writes_file() {
        let root = std::env::temp_dir().join(format!("bugimprints-media-{}", uuid::Uuid::new_v4()));
        let storage = LocalMediaStorage::new(&root);

        let stored = storage.store("trace.log", None, Bytes::from_static(b"stack")).await.unwrap();
        let on_disk = tokio::fs::read(root.join(&stored.reference)).await.unwrap();
        assert_eq!(on_disk, b"stack");

        let again = storage.store("copy.log", None, Bytes::from_static(b"stack")).await.unwrap();
        assert_eq!(again.reference, stored.reference);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
