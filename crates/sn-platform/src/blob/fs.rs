//! Filesystem blob store rooted at the media directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use super::BlobStore;
use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing anything that escapes it.
    fn object_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(PlatformError::internal(format!("invalid blob key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn put_if_absent(&self, key: &str, data: Bytes, content_type: &str) -> Result<bool> {
        let path = self.object_path(key)?;
        if fs::try_exists(&path).await? {
            debug!(key, "Blob already present, skipping write");
            return Ok(false);
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        // Write to a unique temp name, then rename into place.
        let tmp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp_path).await?;
        let written = async {
            file.write_all(&data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(key, content_type, size = data.len(), "Blob stored");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_if_absent_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert!(!store.exists("covers/a.png").await.unwrap());
        assert!(store
            .put_if_absent("covers/a.png", Bytes::from_static(b"one"), "image/png")
            .await
            .unwrap());
        assert!(!store
            .put_if_absent("covers/a.png", Bytes::from_static(b"two"), "image/png")
            .await
            .unwrap());

        let stored = tokio::fs::read(dir.path().join("covers/a.png")).await.unwrap();
        assert_eq!(stored, b"one");
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        assert!(store.exists("../etc/passwd").await.is_err());
        assert!(store.exists("/abs/path").await.is_err());
        assert!(store.exists("").await.is_err());
    }
}
