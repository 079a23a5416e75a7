//! OpenDAL-backed object store
//!
//! Implements the `ObjectStore` trait for any OpenDAL service.

use async_trait::async_trait;
use bridge_traits::error::Result;
use bridge_traits::object_store::{DeleteOutcome, ObjectStore, UploadOptions};
use core_runtime::config::ObjectStoreCredentials;
use opendal::{services, ErrorKind, Operator};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::error::ObjectStoreError;

/// Object store over an OpenDAL operator
///
/// # Example
///
/// ```ignore
/// use provider_object_store::OpendalObjectStore;
/// use bridge_traits::object_store::{ObjectStore, UploadOptions};
///
/// let store = OpendalObjectStore::s3(&credentials)?;
/// store
///     .upload(Path::new("photos/a.jpg"), "a.jpg", &UploadOptions::new("image/jpeg"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct OpendalObjectStore {
    op: Operator,
    backend: &'static str,
}

impl OpendalObjectStore {
    /// Connect to an S3-compatible bucket.
    ///
    /// No request is made until the first operation.
    pub fn s3(credentials: &ObjectStoreCredentials) -> crate::Result<Self> {
        let builder = services::S3::default()
            .bucket(&credentials.bucket)
            .endpoint(&credentials.endpoint)
            .region(&credentials.region)
            .access_key_id(&credentials.access_key_id)
            .secret_access_key(&credentials.secret_access_key);

        let op = Operator::new(builder)
            .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?
            .finish();

        info!(
            bucket = %credentials.bucket,
            endpoint = %credentials.endpoint,
            "Configured S3 object store"
        );

        Ok(Self { op, backend: "s3" })
    }

    /// Use a local directory as the bucket.
    pub fn filesystem(root: &Path) -> crate::Result<Self> {
        let root = root.to_str().ok_or_else(|| {
            ObjectStoreError::InvalidConfig(format!(
                "Store root is not valid UTF-8: {}",
                root.display()
            ))
        })?;

        let op = Operator::new(services::Fs::default().root(root))
            .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?
            .finish();

        Ok(Self { op, backend: "fs" })
    }

    /// Volatile store held in process memory.
    pub fn memory() -> crate::Result<Self> {
        let op = Operator::new(services::Memory::default())
            .map_err(|e| ObjectStoreError::InvalidConfig(e.to_string()))?
            .finish();

        Ok(Self {
            op,
            backend: "memory",
        })
    }

    /// Wrap an already configured operator.
    pub fn from_operator(op: Operator, backend: &'static str) -> Self {
        Self { op, backend }
    }

    async fn list_keys(&self, prefix: &str) -> crate::Result<BTreeSet<String>> {
        let path = list_path(prefix);
        let entries = match self.op.list_with(&path).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(e.into()),
        };

        let keys = entries
            .into_iter()
            .filter(|entry| entry.metadata().is_file())
            .map(|entry| entry.path().trim_start_matches('/').to_string())
            .filter(|key| !key.is_empty())
            .collect();

        Ok(keys)
    }

    async fn put(&self, local_file: &Path, key: &str, options: &UploadOptions) -> crate::Result<()> {
        let body = tokio::fs::read(local_file).await?;
        let size = body.len();
        let capability = self.op.info().full_capability();

        let mut write = self.op.write_with(key, body);
        if capability.write_with_content_type {
            write = write.content_type(&options.content_type);
        }
        if let Some(cache_control) = &options.cache_control {
            if capability.write_with_cache_control {
                write = write.cache_control(cache_control);
            }
        }
        write.await?;

        debug!(key, size, content_type = %options.content_type, "Uploaded object");
        Ok(())
    }

    async fn remove(&self, key: &str) -> crate::Result<DeleteOutcome> {
        match self.op.stat(key).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DeleteOutcome::NotFound),
            Err(e) => return Err(e.into()),
        }

        self.op.delete(key).await?;
        debug!(key, "Deleted object");
        Ok(DeleteOutcome::Deleted)
    }

    async fn fetch(&self, key: &str, local_file: &Path) -> crate::Result<()> {
        let body = match self.op.read(key).await {
            Ok(buffer) => buffer.to_vec(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ObjectStoreError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(parent) = local_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_file, &body).await?;

        debug!(key, size = body.len(), "Downloaded object");
        Ok(())
    }
}

/// Listing path for a key prefix. Prefixes address directories, so a
/// missing trailing slash is added.
fn list_path(prefix: &str) -> String {
    let trimmed = prefix.trim_start_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

#[async_trait]
impl ObjectStore for OpendalObjectStore {
    #[instrument(skip(self), fields(backend = self.backend))]
    async fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        Ok(self.list_keys(prefix).await?)
    }

    #[instrument(skip(self, local_file, options), fields(backend = self.backend))]
    async fn upload(&self, local_file: &Path, key: &str, options: &UploadOptions) -> Result<()> {
        Ok(self.put(local_file, key, options).await?)
    }

    #[instrument(skip(self), fields(backend = self.backend))]
    async fn delete(&self, key: &str) -> Result<DeleteOutcome> {
        Ok(self.remove(key).await?)
    }

    #[instrument(skip(self, local_file), fields(backend = self.backend))]
    async fn download(&self, key: &str, local_file: &Path) -> Result<()> {
        Ok(self.fetch(key, local_file).await?)
    }

    fn backend_name(&self) -> &str {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_path() {
        assert_eq!(list_path(""), "/");
        assert_eq!(list_path("/"), "/");
        assert_eq!(list_path("thumbnails/"), "thumbnails/");
        assert_eq!(list_path("thumbnails"), "thumbnails/");
    }

    #[test]
    fn test_s3_builder_accepts_credentials() {
        let credentials = ObjectStoreCredentials::new(
            "key",
            "secret",
            "photos",
            "https://account.r2.cloudflarestorage.com",
        );
        let store = OpendalObjectStore::s3(&credentials).unwrap();
        assert_eq!(store.backend_name(), "s3");
    }

    #[tokio::test]
    async fn test_memory_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.jpg");
        std::fs::write(&source, b"jpeg bytes").unwrap();

        let store = OpendalObjectStore::memory().unwrap();
        store
            .upload(&source, "album/a.jpg", &UploadOptions::new("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(
            store.list("").await.unwrap(),
            BTreeSet::from(["album/a.jpg".to_string()])
        );

        let target = dir.path().join("out/a.jpg");
        store.download("album/a.jpg", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"jpeg bytes");
    }
}
