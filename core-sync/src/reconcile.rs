//! # Reconciliation Engine
//!
//! Converges the object store onto the set of published photos.
//!
//! ## Workflow
//!
//! 1. Read the published paths from the catalog database
//! 2. Drop paths whose original is missing on disk or that sit in a reserved
//!    top-level folder (warning)
//! 3. Backfill local thumbnails; a path without one is held back this pass
//! 4. List remote originals, ignoring the reserved `thumbnails/` and
//!    `metadata/` namespaces
//! 5. Upload `valid - remote`, delete `remote - valid`
//! 6. Sweep remote thumbnails whose original is no longer valid, and repair
//!    missing thumbnails of originals that are already remote
//! 7. Export and upload the published snapshot
//!
//! A pass never retries and never rolls back. Anything left undone converges
//! on the next pass.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = ReconciliationEngine::new(photos, library, thumbnails, Some(store), exporter);
//! let report = engine.reconcile().await;
//! println!("uploaded {}, deleted {}", report.uploaded, report.deleted);
//! ```

use crate::error::{Result, SyncError};
use crate::report::SyncReport;
use crate::snapshot::SnapshotExporter;
use bridge_traits::object_store::{ObjectStore, UploadOptions};
use core_library::library::LocalLibrary;
use core_library::media::{
    content_type_for, is_reserved_key, original_key_for_thumbnail, thumbnail_key,
    THUMBNAIL_CONTENT_TYPE, THUMBNAIL_PREFIX,
};
use core_library::repositories::PhotoRepository;
use core_thumbnail::ThumbnailService;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Drives one-way convergence from the local catalog to the object store
pub struct ReconciliationEngine {
    photos: Arc<dyn PhotoRepository>,
    library: LocalLibrary,
    thumbnails: Arc<ThumbnailService>,
    store: Option<Arc<dyn ObjectStore>>,
    exporter: SnapshotExporter,
    pass_lock: Mutex<()>,
}

/// Per-pass working sets.
struct PassState {
    /// Published paths whose original exists
    valid: BTreeSet<String>,
    /// Valid paths without a local thumbnail; never uploaded this pass
    held_back: BTreeSet<String>,
    /// Remote originals as listed before any change
    remote: BTreeSet<String>,
}

impl ReconciliationEngine {
    /// Create a new engine
    ///
    /// With `store` unset every pass fails fast with a configuration error.
    pub fn new(
        photos: Arc<dyn PhotoRepository>,
        library: LocalLibrary,
        thumbnails: Arc<ThumbnailService>,
        store: Option<Arc<dyn ObjectStore>>,
        exporter: SnapshotExporter,
    ) -> Self {
        Self {
            photos,
            library,
            thumbnails,
            store,
            exporter,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Run one reconciliation pass.
    ///
    /// Never fails: problems are recorded in the report, and `success` is
    /// false when any error was recorded. A call made while another pass is
    /// running returns at once with an error.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> SyncReport {
        let started = Instant::now();

        let Ok(_guard) = self.pass_lock.try_lock() else {
            return SyncReport::failed(SyncError::SyncInProgress.to_string()).finish(started);
        };

        let Some(store) = self.store.as_deref() else {
            return SyncReport::failed(SyncError::NotConfigured.to_string()).finish(started);
        };

        info!(backend = store.backend_name(), "Starting reconciliation");

        let mut report = SyncReport::default();
        if let Err(e) = self.run_pass(store, &mut report).await {
            report.error(format!("Reconciliation aborted: {}", e));
        }

        let report = report.finish(started);
        info!(
            uploaded = report.uploaded,
            deleted = report.deleted,
            thumbnails_generated = report.thumbnails_generated,
            thumbnails_repaired = report.thumbnails_repaired,
            warnings = report.warnings.len(),
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "Reconciliation finished"
        );
        report
    }

    /// [`reconcile`](Self::reconcile) bounded by `deadline`.
    ///
    /// On expiry the pass is abandoned; operations already completed stay
    /// completed.
    pub async fn reconcile_with_deadline(&self, deadline: Duration) -> SyncReport {
        let started = Instant::now();
        match tokio::time::timeout(deadline, self.reconcile()).await {
            Ok(report) => report,
            Err(_) => {
                let report =
                    SyncReport::failed(SyncError::Timeout(deadline.as_secs()).to_string());
                report.finish(started)
            }
        }
    }

    async fn run_pass(&self, store: &dyn ObjectStore, report: &mut SyncReport) -> Result<()> {
        let published = self.photos.list_published_paths().await?;
        debug!(published = published.len(), "Loaded published paths");

        let valid = self.resolve_originals(&published, report).await;
        let held_back = self.backfill_thumbnails(&valid, report).await;

        let remote: BTreeSet<String> = store
            .list("")
            .await?
            .into_iter()
            .filter(|key| !is_reserved_key(key))
            .collect();

        let state = PassState {
            valid,
            held_back,
            remote,
        };

        let to_upload: Vec<&String> = state
            .valid
            .difference(&state.remote)
            .filter(|path| !state.held_back.contains(*path))
            .collect();
        let to_delete: Vec<&String> = state.remote.difference(&state.valid).collect();

        debug!(
            to_upload = to_upload.len(),
            to_delete = to_delete.len(),
            "Computed differences"
        );

        for path in to_upload {
            self.upload_photo(store, path, report).await;
        }
        for key in to_delete {
            self.delete_photo(store, key, report).await;
        }

        self.sweep_remote_thumbnails(store, &state, report).await;

        match self.exporter.publish(store).await {
            Ok(_) => report.snapshot_exported = true,
            Err(e) => report.warn(format!("Snapshot export failed: {}", e)),
        }

        Ok(())
    }

    async fn resolve_originals(
        &self,
        published: &BTreeSet<String>,
        report: &mut SyncReport,
    ) -> BTreeSet<String> {
        let mut valid = BTreeSet::new();
        for path in published {
            if is_reserved_key(path) {
                report.warn(format!(
                    "Published photo inside a reserved folder, not publishing: {}",
                    path
                ));
                continue;
            }
            if self.library.exists(path).await {
                valid.insert(path.clone());
            } else {
                report.warn(format!("Published photo missing on disk: {}", path));
            }
        }
        valid
    }

    /// Ensure every valid path has a cached thumbnail. Returns the paths that
    /// still have none.
    async fn backfill_thumbnails(
        &self,
        valid: &BTreeSet<String>,
        report: &mut SyncReport,
    ) -> BTreeSet<String> {
        let results = join_all(valid.iter().map(|path| self.thumbnails.ensure(path, false))).await;

        let mut held_back = BTreeSet::new();
        for (path, result) in valid.iter().zip(results) {
            match result {
                Some(handle) if handle.generated => report.thumbnails_generated += 1,
                Some(_) => {}
                None => {
                    report.warn(format!(
                        "Thumbnail generation failed for {}; not uploading this pass",
                        path
                    ));
                    held_back.insert(path.clone());
                }
            }
        }
        held_back
    }

    async fn upload_photo(&self, store: &dyn ObjectStore, path: &str, report: &mut SyncReport) {
        let local = match self.library.original_path(path) {
            Ok(local) => local,
            Err(e) => {
                report.error(format!("Failed to upload {}: {}", path, e));
                return;
            }
        };

        let options = UploadOptions::new(content_type_for(path));
        if let Err(e) = store.upload(&local, path, &options).await {
            report.error(format!("Failed to upload {}: {}", path, e));
            return;
        }
        report.uploaded += 1;
        report.uploaded_files.push(path.to_string());
        debug!(path, "Uploaded original");

        if let Err(message) = self.upload_thumbnail(store, path).await {
            report.warn(format!("Uploaded {} without thumbnail: {}", path, message));
        }
    }

    async fn upload_thumbnail(
        &self,
        store: &dyn ObjectStore,
        path: &str,
    ) -> std::result::Result<(), String> {
        let local = self.thumbnails.thumbnail_path(path).map_err(|e| e.to_string())?;
        store
            .upload(&local, &thumbnail_key(path), &UploadOptions::new(THUMBNAIL_CONTENT_TYPE))
            .await
            .map_err(|e| e.to_string())
    }

    async fn delete_photo(&self, store: &dyn ObjectStore, key: &str, report: &mut SyncReport) {
        if let Err(e) = store.delete(key).await {
            report.error(format!("Failed to delete {}: {}", key, e));
            return;
        }
        report.deleted += 1;
        report.deleted_files.push(key.to_string());
        debug!(key, "Deleted original");

        if let Err(e) = store.delete(&thumbnail_key(key)).await {
            report.warn(format!("Failed to delete thumbnail of {}: {}", key, e));
        }
    }

    /// Remove remote thumbnails without a valid original, then upload the
    /// missing thumbnails of originals that were already remote.
    async fn sweep_remote_thumbnails(
        &self,
        store: &dyn ObjectStore,
        state: &PassState,
        report: &mut SyncReport,
    ) {
        let remote_thumbnails = match store.list(THUMBNAIL_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                report.warn(format!("Skipping thumbnail sweep, listing failed: {}", e));
                return;
            }
        };

        for key in &remote_thumbnails {
            let keep = original_key_for_thumbnail(key)
                .map(|original| state.valid.contains(original))
                .unwrap_or(false);
            if keep {
                continue;
            }

            match store.delete(key).await {
                Ok(_) => {
                    report.orphaned_thumbnails_deleted += 1;
                    debug!(key = %key, "Deleted orphaned thumbnail");
                }
                Err(e) => report.warn(format!("Failed to delete orphaned thumbnail {}: {}", key, e)),
            }
        }

        let needs_repair = state
            .valid
            .intersection(&state.remote)
            .filter(|path| !state.held_back.contains(*path))
            .filter(|path| !remote_thumbnails.contains(&thumbnail_key(path)));

        for path in needs_repair {
            match self.upload_thumbnail(store, path).await {
                Ok(()) => {
                    report.thumbnails_repaired += 1;
                    debug!(path = %path, "Repaired remote thumbnail");
                }
                Err(message) => {
                    report.warn(format!("Failed to repair thumbnail of {}: {}", path, message))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::object_store::DeleteOutcome;
    use core_library::db::create_test_pool;
    use core_library::models::PhotoRecord;
    use core_library::repositories::SqlitePhotoRepository;
    use core_thumbnail::ThumbnailConfig;
    use mockall::mock;
    use std::path::Path;

    mock! {
        Store {}

        #[async_trait]
        impl ObjectStore for Store {
            async fn list(&self, prefix: &str) -> bridge_traits::error::Result<BTreeSet<String>>;
            async fn upload(
                &self,
                local_file: &Path,
                key: &str,
                options: &UploadOptions,
            ) -> bridge_traits::error::Result<()>;
            async fn delete(&self, key: &str) -> bridge_traits::error::Result<DeleteOutcome>;
            async fn download(&self, key: &str, local_file: &Path) -> bridge_traits::error::Result<()>;
        }
    }

    async fn engine_with(store: Option<Arc<dyn ObjectStore>>) -> (ReconciliationEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_test_pool().await.unwrap();
        let photos = Arc::new(SqlitePhotoRepository::new(pool.clone()));
        photos
            .insert(&PhotoRecord::new("a.jpg").with_published(true))
            .await
            .unwrap();

        let thumbnails = Arc::new(ThumbnailService::new(ThumbnailConfig::new(
            dir.path().join("photos"),
            dir.path().join("thumbnails"),
        )));
        let exporter = SnapshotExporter::new(pool, photos.clone());
        let engine = ReconciliationEngine::new(
            photos,
            LocalLibrary::new(dir.path().join("photos")),
            thumbnails,
            store,
            exporter,
        );
        (engine, dir)
    }

    #[tokio::test]
    async fn test_unconfigured_store_fails_without_work() {
        let (engine, _dir) = engine_with(None).await;

        let report = engine.reconcile().await;

        assert!(!report.success);
        assert_eq!(report.errors.len(), 1);
        assert!(report.warnings.is_empty(), "no work is attempted");
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_pass() {
        let mut store = MockStore::new();
        store
            .expect_list()
            .returning(|_| Err(BridgeError::OperationFailed("access denied".to_string())));
        store.expect_upload().never();
        store.expect_delete().never();

        let (engine, _dir) = engine_with(Some(Arc::new(store))).await;
        let report = engine.reconcile().await;

        assert!(!report.success);
        assert!(report.errors[0].contains("access denied"));
        assert!(!report.snapshot_exported);
    }

    #[tokio::test]
    async fn test_second_concurrent_pass_is_rejected() {
        let (engine, _dir) = engine_with(None).await;

        let _held = engine.pass_lock.lock().await;
        let report = engine.reconcile().await;

        assert!(!report.success);
        assert_eq!(report.errors, vec!["Reconciliation already in progress".to_string()]);
    }
}
