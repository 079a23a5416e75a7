//! Core service façade and bootstrap helpers.
//!
//! This crate wires configuration into the shared core: it opens the catalog
//! database, builds the repositories, the thumbnail cache and the object
//! store client, and hands them to the reconciliation engine. The default
//! `object-store` feature builds the store from `R2_*` credentials through
//! `provider-object-store`; hosts can also inject any `ObjectStore` with
//! [`CatalogService::with_store`].

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::IndexSummary;
pub use core_runtime::config::CatalogConfig;
pub use core_sync::{BootstrapOutcome, SyncReport};
pub use core_thumbnail::GenerationSummary;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::ObjectStore;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::repositories::{
    AlbumRepository, PhotoRepository, SqliteAlbumRepository, SqlitePhotoRepository,
};
use core_library::LocalLibrary;
use core_sync::{ReconciliationEngine, SnapshotBootstrapper, SnapshotExporter};
use core_thumbnail::{ThumbnailConfig, ThumbnailService};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

/// Build the object store client described by `config`.
///
/// Returns `None` when no credentials are configured.
#[cfg(feature = "object-store")]
pub fn build_object_store(config: &CatalogConfig) -> Result<Option<Arc<dyn ObjectStore>>> {
    let Some(credentials) = config.credentials() else {
        return Ok(None);
    };

    let store = provider_object_store::OpendalObjectStore::s3(credentials)
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    Ok(Some(Arc::new(store)))
}

/// Without a provider compiled in, no store can be built.
#[cfg(not(feature = "object-store"))]
pub fn build_object_store(_config: &CatalogConfig) -> Result<Option<Arc<dyn ObjectStore>>> {
    Ok(None)
}

/// Replace the local database with the published snapshot.
///
/// Must run before the database is opened.
pub async fn bootstrap_database(
    config: &CatalogConfig,
    store: Option<Arc<dyn ObjectStore>>,
) -> Result<BootstrapOutcome> {
    let bootstrapper = SnapshotBootstrapper::new(store, config.use_cdn);
    Ok(bootstrapper.bootstrap(&config.database_path).await?)
}

struct Inner {
    config: CatalogConfig,
    pool: SqlitePool,
    photos: Arc<dyn PhotoRepository>,
    albums: Arc<dyn AlbumRepository>,
    library: LocalLibrary,
    thumbnails: Arc<ThumbnailService>,
    engine: ReconciliationEngine,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<Inner>,
}

impl CatalogService {
    /// Validate `config`, open the database and connect the configured store.
    pub async fn open(config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let store = build_object_store(&config)?;
        Self::with_store(config, store).await
    }

    /// Like [`open`](Self::open) with an explicit object store.
    #[instrument(skip(config, store), fields(database = %config.database_path.display()))]
    pub async fn with_store(
        config: CatalogConfig,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Result<Self> {
        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        Ok(Self::assemble(config, pool, store))
    }

    /// Assemble the service over an already migrated pool.
    pub fn from_pool(
        config: CatalogConfig,
        pool: SqlitePool,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        Self::assemble(config, pool, store)
    }

    fn assemble(
        config: CatalogConfig,
        pool: SqlitePool,
        store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let photos: Arc<dyn PhotoRepository> = Arc::new(SqlitePhotoRepository::new(pool.clone()));
        let albums: Arc<dyn AlbumRepository> = Arc::new(SqliteAlbumRepository::new(pool.clone()));
        let library = LocalLibrary::new(&config.photos_dir);
        let thumbnails = Arc::new(ThumbnailService::new(ThumbnailConfig::from(&config)));
        let exporter = SnapshotExporter::new(pool.clone(), Arc::clone(&photos));

        let engine = ReconciliationEngine::new(
            Arc::clone(&photos),
            library.clone(),
            Arc::clone(&thumbnails),
            store,
            exporter,
        );

        info!(
            photos_dir = %config.photos_dir.display(),
            store_configured = engine.is_configured(),
            "Catalog service ready"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                pool,
                photos,
                albums,
                library,
                thumbnails,
                engine,
            }),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn photos(&self) -> Arc<dyn PhotoRepository> {
        Arc::clone(&self.inner.photos)
    }

    pub fn albums(&self) -> Arc<dyn AlbumRepository> {
        Arc::clone(&self.inner.albums)
    }

    pub fn thumbnails(&self) -> Arc<ThumbnailService> {
        Arc::clone(&self.inner.thumbnails)
    }

    /// Run one reconciliation pass.
    pub async fn reconcile(&self) -> SyncReport {
        self.inner.engine.reconcile().await
    }

    /// Run one reconciliation pass, giving up after `deadline`.
    pub async fn reconcile_with_deadline(&self, deadline: Duration) -> SyncReport {
        self.inner.engine.reconcile_with_deadline(deadline).await
    }

    /// Align the `photos` table with the files under the photos root.
    ///
    /// New files are recorded unpublished with their dimensions and EXIF
    /// attributes; records of vanished files are removed.
    pub async fn index_library(&self) -> Result<IndexSummary> {
        let files = self.inner.library.list_files().await?;
        let existing = self.inner.photos.all_paths().await?;

        let mut metadata = BTreeMap::new();
        for path in files.difference(&existing) {
            let exif = self.inner.library.read_metadata(path).await?;
            metadata.insert(path.clone(), exif);
        }
        debug!(new = metadata.len(), "Read metadata of new photos");

        let summary = self.inner.photos.sync_paths(&files, &metadata).await?;
        info!(added = summary.added, removed = summary.removed, "Indexed library");
        Ok(summary)
    }

    /// Generate thumbnails for every image under the photos root.
    pub async fn generate_thumbnails(&self, force: bool) -> Result<GenerationSummary> {
        let files = self.inner.library.list_files().await?;
        Ok(self.inner.thumbnails.generate_all(&files, force).await)
    }

    /// Remove cached thumbnails whose original no longer exists.
    pub async fn cleanup_thumbnails(&self) -> Result<usize> {
        let files = self.inner.library.list_files().await?;
        Ok(self.inner.thumbnails.cleanup_orphaned(&files).await)
    }
}
