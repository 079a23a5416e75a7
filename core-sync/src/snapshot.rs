//! # Published Snapshot
//!
//! A standalone SQLite file holding only the published photos, uploaded so a
//! fresh deployment can serve the catalog without listing the bucket.
//!
//! ## Producer
//!
//! [`SnapshotExporter`] copies the `photos` schema out of `sqlite_master`
//! into a new file and fills it with the published rows, columns verbatim.
//! The file is a [`SnapshotFile`] that deletes itself when dropped.
//!
//! ## Consumer
//!
//! [`SnapshotBootstrapper`] downloads the snapshot over the local database
//! path on startup.

use crate::error::{Result, SyncError};
use bridge_traits::object_store::{ObjectStore, UploadOptions};
use core_library::media::{SNAPSHOT_CACHE_CONTROL, SNAPSHOT_CONTENT_TYPE, SNAPSHOT_KEY};
use core_library::repositories::PhotoRepository;
use core_library::models::PhotoRow;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::{query, query_scalar, ConnectOptions, Connection, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Snapshot written to a temporary file. Dropping it removes the file.
#[derive(Debug)]
pub struct SnapshotFile {
    file: NamedTempFile,
    rows: usize,
}

impl SnapshotFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of photo rows in the snapshot
    pub fn row_count(&self) -> usize {
        self.rows
    }
}

/// Exports published photos into a portable SQLite file
pub struct SnapshotExporter {
    pool: SqlitePool,
    photos: Arc<dyn PhotoRepository>,
    temp_dir: Option<PathBuf>,
}

impl SnapshotExporter {
    pub fn new(pool: SqlitePool, photos: Arc<dyn PhotoRepository>) -> Self {
        Self {
            pool,
            photos,
            temp_dir: None,
        }
    }

    /// Create snapshot files in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Write the published rows into a new snapshot file.
    ///
    /// # Errors
    ///
    /// Fails if the source schema cannot be read, the temporary file cannot
    /// be created, or any row fails to copy. No file is left behind.
    #[instrument(skip(self))]
    pub async fn export_published_snapshot(&self) -> Result<SnapshotFile> {
        let schema: Vec<String> = query_scalar(
            r#"
            SELECT sql FROM sqlite_master
            WHERE tbl_name = 'photos' AND sql IS NOT NULL
            ORDER BY CASE type WHEN 'table' THEN 0 ELSE 1 END, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if schema.is_empty() {
            return Err(SyncError::Snapshot(
                "Source database has no photos table".to_string(),
            ));
        }

        let rows = self.photos.published_rows().await?;

        let file = match &self.temp_dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };

        let mut conn = SqliteConnectOptions::new()
            .filename(file.path())
            .journal_mode(SqliteJournalMode::Delete)
            .connect()
            .await?;

        // Close before surfacing a copy error so the rollback journal is gone
        // together with the file
        let copied = copy_rows(&mut conn, &schema, &rows).await;
        let closed = conn.close().await;
        copied?;
        closed?;

        debug!(rows = rows.len(), file = %file.path().display(), "Exported snapshot");

        Ok(SnapshotFile {
            file,
            rows: rows.len(),
        })
    }

    /// Export the snapshot and upload it under the snapshot key.
    ///
    /// Returns the number of rows published. The local file is removed
    /// whether or not the upload succeeds.
    pub async fn publish(&self, store: &dyn ObjectStore) -> Result<usize> {
        let snapshot = self.export_published_snapshot().await?;
        let options =
            UploadOptions::new(SNAPSHOT_CONTENT_TYPE).with_cache_control(SNAPSHOT_CACHE_CONTROL);

        store.upload(snapshot.path(), SNAPSHOT_KEY, &options).await?;

        info!(rows = snapshot.row_count(), key = SNAPSHOT_KEY, "Published snapshot");
        Ok(snapshot.row_count())
    }
}

/// Result of a bootstrap attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The snapshot replaced the local database
    Downloaded,
    /// No snapshot has been published yet
    NotFound,
    /// CDN mode is off or no store is configured
    Skipped,
}

/// Seeds the local database from the published snapshot
pub struct SnapshotBootstrapper {
    store: Option<Arc<dyn ObjectStore>>,
    use_cdn: bool,
}

impl SnapshotBootstrapper {
    pub fn new(store: Option<Arc<dyn ObjectStore>>, use_cdn: bool) -> Self {
        Self { store, use_cdn }
    }

    /// Download the snapshot over `database_path`.
    ///
    /// The download lands in a sibling temporary file that is renamed into
    /// place, so an interrupted transfer leaves the old database intact.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self, database_path: &Path) -> Result<BootstrapOutcome> {
        if !self.use_cdn {
            debug!("CDN mode disabled, skipping snapshot download");
            return Ok(BootstrapOutcome::Skipped);
        }
        let Some(store) = self.store.as_deref() else {
            info!("Object store not configured, skipping snapshot download");
            return Ok(BootstrapOutcome::Skipped);
        };

        let parent = match database_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;
        let staging = NamedTempFile::new_in(&parent)?;

        match store.download(SNAPSHOT_KEY, staging.path()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("No published snapshot yet; starting with an empty catalog");
                return Ok(BootstrapOutcome::NotFound);
            }
            Err(e) => return Err(e.into()),
        }

        remove_sidecars(database_path).await?;
        staging.persist(database_path).map_err(|e| SyncError::Io(e.error))?;

        info!(path = %database_path.display(), "Downloaded published snapshot");
        Ok(BootstrapOutcome::Downloaded)
    }
}

async fn copy_rows(conn: &mut SqliteConnection, schema: &[String], rows: &[PhotoRow]) -> Result<()> {
    let mut tx = conn.begin().await?;
    for ddl in schema {
        query(ddl.as_str()).execute(&mut *tx).await?;
    }

    for row in rows {
        query(
            r#"
            INSERT INTO photos (
                id, path, filename, album, published, custom_title, description,
                tags, notes, exif_data, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(row.id)
        .bind(&row.path)
        .bind(&row.filename)
        .bind(&row.album)
        .bind(row.published)
        .bind(&row.custom_title)
        .bind(&row.description)
        .bind(&row.tags)
        .bind(&row.notes)
        .bind(&row.exif_data)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Remove the WAL and shared-memory files of the database being replaced.
///
/// SQLite would otherwise replay a stale log onto the new file.
async fn remove_sidecars(database_path: &Path) -> Result<()> {
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = database_path.as_os_str().to_owned();
        sidecar.push(suffix);
        match tokio::fs::remove_file(&sidecar).await {
            Ok(()) => debug!(path = ?sidecar, "Removed stale database sidecar"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::db::create_test_pool;
    use core_library::models::PhotoRecord;
    use core_library::repositories::SqlitePhotoRepository;

    async fn exporter_with(photos: &[(&str, bool)]) -> SnapshotExporter {
        let pool = create_test_pool().await.unwrap();
        let repo = Arc::new(SqlitePhotoRepository::new(pool.clone()));
        for (path, published) in photos {
            repo.insert(&PhotoRecord::new(*path).with_published(*published))
                .await
                .unwrap();
        }
        SnapshotExporter::new(pool, repo)
    }

    #[tokio::test]
    async fn test_snapshot_contains_only_published_rows() {
        let exporter = exporter_with(&[("a.jpg", true), ("b.jpg", false), ("c.jpg", true)]).await;

        let snapshot = exporter.export_published_snapshot().await.unwrap();
        assert_eq!(snapshot.row_count(), 2);

        let mut conn = SqliteConnectOptions::new()
            .filename(snapshot.path())
            .connect()
            .await
            .unwrap();
        let paths: Vec<String> = query_scalar("SELECT path FROM photos ORDER BY path")
            .fetch_all(&mut conn)
            .await
            .unwrap();
        assert_eq!(paths, vec!["a.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_snapshot_file_removed_on_drop() {
        let exporter = exporter_with(&[("a.jpg", true)]).await;
        let snapshot = exporter.export_published_snapshot().await.unwrap();
        let path = snapshot.path().to_path_buf();
        assert!(path.exists());

        drop(snapshot);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_empty_catalog_exports_empty_table() {
        let exporter = exporter_with(&[]).await;
        let snapshot = exporter.export_published_snapshot().await.unwrap();
        assert_eq!(snapshot.row_count(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_skipped_without_cdn() {
        let dir = tempfile::tempdir().unwrap();
        let bootstrapper = SnapshotBootstrapper::new(None, true);
        assert_eq!(
            bootstrapper.bootstrap(&dir.path().join("photos.db")).await.unwrap(),
            BootstrapOutcome::Skipped
        );

        let bootstrapper = SnapshotBootstrapper::new(None, false);
        assert_eq!(
            bootstrapper.bootstrap(&dir.path().join("photos.db")).await.unwrap(),
            BootstrapOutcome::Skipped
        );
    }
}
