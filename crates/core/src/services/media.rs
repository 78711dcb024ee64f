//! Product image storage.
//!
//! Images are uploaded by the client before a product is created; the core
//! only ever deletes them, and only on a best-effort basis after the
//! transaction that soft-deleted their product has committed.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fanforge_common::{AppError, AppResult};
use tracing::{debug, warn};

/// Image storage backend.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Delete the files stored under `keys`. Missing files are not an error.
    async fn delete(&self, keys: &[String]) -> AppResult<()>;
}

/// Type alias for a shared image store.
pub type ImageStoreService = Arc<dyn ImageStore>;

/// Files under a base directory, one per key.
#[derive(Clone)]
pub struct LocalImageStore {
    base_path: PathBuf,
}

impl LocalImageStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Resolve a key to a path inside the base directory.
    fn get_path(&self, key: &str) -> AppResult<PathBuf> {
        if !is_valid_key(key) {
            return Err(AppError::BadRequest(format!("Invalid image key: {key}")));
        }
        Ok(self.base_path.join(key))
    }
}

/// A key must be a non-empty relative path made only of normal components.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && Path::new(key)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn delete(&self, keys: &[String]) -> AppResult<()> {
        let mut failed = 0usize;
        let mut invalid = 0usize;
        for key in keys {
            let path = match self.get_path(key) {
                Ok(path) => path,
                Err(e) => {
                    warn!(key = %key, error = %e, "Skipping invalid image key");
                    invalid += 1;
                    continue;
                }
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(key = %key, "Deleted image"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to delete image");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(AppError::Internal(format!(
                "Failed to delete {failed} of {} images",
                keys.len()
            )));
        }
        if invalid > 0 {
            return Err(AppError::BadRequest(format!(
                "Skipped {invalid} invalid image keys"
            )));
        }
        Ok(())
    }
}

/// Keeps nothing, deletes nothing.
#[derive(Clone, Default)]
pub struct NoOpImageStore;

#[async_trait]
impl ImageStore for NoOpImageStore {
    async fn delete(&self, _keys: &[String]) -> AppResult<()> {
        Ok(())
    }
}

/// Runs image deletions in the background.
#[derive(Clone)]
pub struct MediaCleaner {
    store: ImageStoreService,
}

impl MediaCleaner {
    #[must_use]
    pub fn new(store: ImageStoreService) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn noop() -> Self {
        Self::new(Arc::new(NoOpImageStore))
    }

    /// Delete `keys` on a spawned task. Failures are logged only.
    pub fn cleanup(&self, keys: Vec<String>) {
        if keys.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.delete(&keys).await {
                warn!(error = %e, count = keys.len(), "Image cleanup failed");
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fanforge-media-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_local_delete_removes_files_and_ignores_missing() {
        let dir = temp_dir("delete");
        std::fs::write(dir.join("a.jpg"), b"jpeg").unwrap();

        let store = LocalImageStore::new(dir.clone());
        store
            .delete(&["a.jpg".to_string(), "missing.jpg".to_string()])
            .await
            .unwrap();

        assert!(!dir.join("a.jpg").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_local_delete_rejects_escaping_keys() {
        let store = LocalImageStore::new(temp_dir("escape"));
        let result = store.delete(&["../etc/passwd".to_string()]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = store.delete(&["/etc/passwd".to_string()]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_invalid_key_does_not_stop_remaining_deletions() {
        let dir = temp_dir("skip");
        std::fs::write(dir.join("good.jpg"), b"jpeg").unwrap();

        let store = LocalImageStore::new(dir.clone());
        let result = store
            .delete(&["../bad".to_string(), "good.jpg".to_string()])
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!dir.join("good.jpg").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_key_rules() {
        assert!(is_valid_key("products/p1/0.jpg"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("../p1.jpg"));
        assert!(!is_valid_key("products/../../p1.jpg"));
        assert!(!is_valid_key("/var/p1.jpg"));
        assert!(!is_valid_key("./p1.jpg"));
    }
}
