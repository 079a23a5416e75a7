//! Object Storage Abstraction
//!
//! Keyed blob storage used as the public content origin. Keys are
//! forward-slash separated relative paths (`album/photo.jpg`,
//! `thumbnails/album/photo.jpg`, `metadata/published.db`).

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;

/// Result of a delete request.
///
/// Deleting a key that does not exist is not an error; callers that treat a
/// missing object as "already done" match on [`DeleteOutcome::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object existed and was removed
    Deleted,
    /// Nothing was stored under the key
    NotFound,
}

/// Per-object headers stored alongside an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// MIME type served with the object
    pub content_type: String,
    /// Optional `Cache-Control` header value
    pub cache_control: Option<String>,
}

impl UploadOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control: None,
        }
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// Remote object store trait
///
/// Implementations:
/// - S3-compatible buckets (Cloudflare R2, AWS S3, MinIO)
/// - A local directory acting as a bucket
/// - In-memory fakes for tests
///
/// # Example
///
/// ```ignore
/// use bridge_traits::object_store::ObjectStore;
///
/// async fn publish(store: &dyn ObjectStore, file: &Path) -> Result<()> {
///     let options = UploadOptions::new("image/jpeg");
///     store.upload(file, "album/photo.jpg", &options).await
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object key under `prefix` (`""` lists the whole store).
    ///
    /// Only objects are returned, never directory placeholders. A prefix with
    /// nothing under it yields an empty set rather than an error.
    async fn list(&self, prefix: &str) -> Result<BTreeSet<String>>;

    /// Upload a local file under `key`, overwriting any existing object.
    ///
    /// # Arguments
    ///
    /// * `local_file` - File to read the object body from
    /// * `key` - Destination key
    /// * `options` - Headers stored with the object
    async fn upload(&self, local_file: &Path, key: &str, options: &UploadOptions) -> Result<()>;

    /// Delete the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<DeleteOutcome>;

    /// Download the object stored under `key` into `local_file`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`](crate::BridgeError::NotFound) when no
    /// object exists under `key`.
    async fn download(&self, key: &str, local_file: &Path) -> Result<()>;

    /// Backend name for log lines (e.g. `s3`, `fs`, `memory`).
    fn backend_name(&self) -> &str {
        "object-store"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use mockall::mock;
    use std::path::PathBuf;
    use std::sync::Arc;

    mock! {
        Store {}

        #[async_trait]
        impl ObjectStore for Store {
            async fn list(&self, prefix: &str) -> Result<BTreeSet<String>>;
            async fn upload(&self, local_file: &Path, key: &str, options: &UploadOptions) -> Result<()>;
            async fn delete(&self, key: &str) -> Result<DeleteOutcome>;
            async fn download(&self, key: &str, local_file: &Path) -> Result<()>;
        }
    }

    #[tokio::test]
    async fn test_trait_object_dispatch() {
        let mut mock = MockStore::new();
        mock.expect_list()
            .withf(|prefix| prefix.is_empty())
            .returning(|_| Ok(BTreeSet::from(["a.jpg".to_string(), "b.png".to_string()])));
        mock.expect_delete()
            .withf(|key| key == "missing.jpg")
            .returning(|_| Ok(DeleteOutcome::NotFound));

        let store: Arc<dyn ObjectStore> = Arc::new(mock);

        let keys = store.list("").await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains("a.jpg"));

        let outcome = store.delete("missing.jpg").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotFound);
        assert_eq!(store.backend_name(), "object-store");
    }

    #[tokio::test]
    async fn test_download_not_found_is_distinguishable() {
        let mut mock = MockStore::new();
        mock.expect_download()
            .returning(|key, _| Err(BridgeError::NotFound(key.to_string())));

        let err = mock
            .download("metadata/published.db", &PathBuf::from("/tmp/x.db"))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("metadata/published.db"));
    }

    #[tokio::test]
    async fn test_upload_receives_options() {
        let mut mock = MockStore::new();
        mock.expect_upload()
            .withf(|_, key, options| {
                key == "metadata/published.db"
                    && options.content_type == "application/x-sqlite3"
                    && options.cache_control.as_deref() == Some("no-cache")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let options = UploadOptions::new("application/x-sqlite3").with_cache_control("no-cache");
        mock.upload(Path::new("/tmp/snapshot.db"), "metadata/published.db", &options)
            .await
            .unwrap();
    }

    #[test]
    fn test_upload_options_default_has_no_cache_control() {
        let options = UploadOptions::new("image/jpeg");
        assert_eq!(options.content_type, "image/jpeg");
        assert!(options.cache_control.is_none());
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = BridgeError::OperationFailed("timeout".to_string());
        assert!(!err.is_not_found());
    }
}
