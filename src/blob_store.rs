use crate::diary_entry::{EntryId, UserId};
use crate::error::BlobError;
use chrono::Utc;
use futures::future::BoxFuture;
use log::{debug, info};
use std::path::{Component, Path, PathBuf};

const FILE_SCHEME: &str = "file://";

pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `path` and returns a URL for it.
    fn upload(&self, path: String, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, BlobError>>;

    fn delete(&self, url: String) -> BoxFuture<'_, Result<(), BlobError>>;
}

/// Blob path for an image attached to `entry`, namespaced by user.
pub fn image_path(user: &UserId, entry: &EntryId, file_name: &str) -> String {
    format!(
        "images/{}/{}/{}_{}",
        user,
        entry,
        Utc::now().timestamp_millis(),
        file_name
    )
}

/// Blobs kept as plain files below a root directory.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBlobStore { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn url_to_path(&self, url: &str) -> Result<PathBuf, BlobError> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| BlobError::InvalidUrl(url.to_string()))?;
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| BlobError::InvalidPath(url.to_string()))?;
        self.resolve(&relative.to_string_lossy())
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(&self, path: String, bytes: Vec<u8>) -> BoxFuture<'_, Result<String, BlobError>> {
        Box::pin(async move {
            let target = self.resolve(&path)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &bytes).await?;
            info!("Stored {} bytes at {}", bytes.len(), target.display());
            Ok(format!("{}{}", FILE_SCHEME, target.display()))
        })
    }

    fn delete(&self, url: String) -> BoxFuture<'_, Result<(), BlobError>> {
        Box::pin(async move {
            let target = self.url_to_path(&url)?;
            tokio::fs::remove_file(&target).await?;
            debug!("Removed blob {}", target.display());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_paths_are_namespaced_by_user_and_entry() {
        let path = image_path(&UserId::new("u1"), &EntryId::new("e1"), "cat.png");
        assert!(path.starts_with("images/u1/e1/"));
        assert!(path.ends_with("_cat.png"));
    }

    #[tokio::test]
    async fn upload_then_delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let url = store
            .upload("images/u1/e1/1_cat.png".into(), b"meow".to_vec())
            .await
            .unwrap();
        let file = dir.path().join("images/u1/e1/1_cat.png");
        assert_eq!(std::fs::read(&file).unwrap(), b"meow");

        store.delete(url).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn deleting_a_missing_blob_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let url = format!("file://{}", dir.path().join("images/nothing.png").display());
        assert!(matches!(store.delete(url).await, Err(BlobError::Io(_))));
    }

    #[tokio::test]
    async fn paths_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());
        let err = store
            .upload("../outside.png".into(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::InvalidPath(_)));

        let err = store
            .delete("https://example.com/a.png".into())
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::InvalidUrl(_)));
    }
}
