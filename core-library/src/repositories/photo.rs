//! Photo repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{
    encode_tags, validate_relative_path, ExifData, PhotoRecord, PhotoRow, PhotoUpdate,
};
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Outcome of aligning the `photos` table with the files on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Records created for new files (unpublished)
    pub added: usize,
    /// Records removed because their file no longer exists
    pub removed: usize,
}

/// Photo repository interface for data access operations
#[async_trait]
pub trait PhotoRepository: Send + Sync {
    /// Find a photo by its relative path
    ///
    /// # Returns
    /// - `Ok(Some(photo))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_path(&self, path: &str) -> Result<Option<PhotoRecord>>;

    /// Insert a new photo and return its database id
    ///
    /// # Errors
    /// Returns error if:
    /// - A photo with the same path already exists
    /// - Photo validation fails
    /// - Database error occurs
    async fn insert(&self, photo: &PhotoRecord) -> Result<i64>;

    /// Apply a partial update to the photo at `path`
    ///
    /// # Returns
    /// - `Ok(true)` if the photo was updated
    /// - `Ok(false)` if no photo exists at `path`
    ///
    /// # Errors
    /// Returns `InvalidInput` when the update sets no field.
    async fn update(&self, path: &str, update: &PhotoUpdate) -> Result<bool>;

    /// Delete a photo by path
    ///
    /// # Returns
    /// - `Ok(true)` if photo was deleted
    /// - `Ok(false)` if photo was not found
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Paths of every photo flagged as published
    async fn list_published_paths(&self) -> Result<BTreeSet<String>>;

    /// Every photo, ordered by path
    async fn all(&self) -> Result<Vec<PhotoRecord>>;

    /// Every path known to the database
    async fn all_paths(&self) -> Result<BTreeSet<String>>;

    /// Raw rows of every published photo, for verbatim export
    async fn published_rows(&self) -> Result<Vec<PhotoRow>>;

    /// Count total photos
    async fn count(&self) -> Result<i64>;

    /// Count published photos
    async fn count_published(&self) -> Result<i64>;

    /// Flag every photo as published, returning how many changed
    async fn publish_all(&self) -> Result<u64>;

    /// Create unpublished records for new paths and drop records whose path is
    /// not in `paths`
    ///
    /// New records take their EXIF bag from `metadata` when it has an entry.
    async fn sync_paths(
        &self,
        paths: &BTreeSet<String>,
        metadata: &BTreeMap<String, ExifData>,
    ) -> Result<IndexSummary>;
}

/// SQLite implementation of PhotoRepository
pub struct SqlitePhotoRepository {
    pool: SqlitePool,
}

impl SqlitePhotoRepository {
    /// Create a new SqlitePhotoRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PhotoRepository for SqlitePhotoRepository {
    async fn find_by_path(&self, path: &str) -> Result<Option<PhotoRecord>> {
        let row = query_as::<_, PhotoRow>("SELECT * FROM photos WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(PhotoRecord::from))
    }

    async fn insert(&self, photo: &PhotoRecord) -> Result<i64> {
        photo.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Photo".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO photos (
                path, filename, album, published, custom_title, description,
                tags, notes, exif_data, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&photo.path)
        .bind(&photo.filename)
        .bind(&photo.album)
        .bind(photo.published)
        .bind(&photo.custom_title)
        .bind(&photo.description)
        .bind(photo.tags_json())
        .bind(&photo.notes)
        .bind(photo.exif_json())
        .bind(photo.created_at)
        .bind(photo.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, path: &str, update: &PhotoUpdate) -> Result<bool> {
        if update.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "PhotoUpdate".to_string(),
                message: "Update must set at least one field".to_string(),
            });
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE photos SET ");
        let mut columns = builder.separated(", ");

        if let Some(published) = update.published {
            columns.push("published = ").push_bind_unseparated(published);
        }
        if let Some(custom_title) = &update.custom_title {
            columns
                .push("custom_title = ")
                .push_bind_unseparated(custom_title.clone());
        }
        if let Some(description) = &update.description {
            columns
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(tags) = &update.tags {
            columns.push("tags = ").push_bind_unseparated(encode_tags(tags));
        }
        if let Some(notes) = &update.notes {
            columns.push("notes = ").push_bind_unseparated(notes.clone());
        }
        if let Some(album) = &update.album {
            columns.push("album = ").push_bind_unseparated(album.clone());
        }
        if let Some(filename) = &update.filename {
            if filename.trim().is_empty() {
                return Err(LibraryError::InvalidInput {
                    field: "filename".to_string(),
                    message: "Photo filename cannot be empty".to_string(),
                });
            }
            columns
                .push("filename = ")
                .push_bind_unseparated(filename.clone());
        }
        columns
            .push("updated_at = ")
            .push_bind_unseparated(chrono::Utc::now().timestamp());

        builder.push(" WHERE path = ").push_bind(path);

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let result = query("DELETE FROM photos WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_published_paths(&self) -> Result<BTreeSet<String>> {
        let rows: Vec<(String,)> = query_as("SELECT path FROM photos WHERE published = 1")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    async fn all(&self) -> Result<Vec<PhotoRecord>> {
        let rows = query_as::<_, PhotoRow>("SELECT * FROM photos ORDER BY path ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(PhotoRecord::from).collect())
    }

    async fn all_paths(&self) -> Result<BTreeSet<String>> {
        let rows: Vec<(String,)> = query_as("SELECT path FROM photos")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    async fn published_rows(&self) -> Result<Vec<PhotoRow>> {
        let rows =
            query_as::<_, PhotoRow>("SELECT * FROM photos WHERE published = 1 ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM photos")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn count_published(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM photos WHERE published = 1")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn publish_all(&self) -> Result<u64> {
        let result = query("UPDATE photos SET published = 1, updated_at = ? WHERE published = 0")
            .bind(chrono::Utc::now().timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn sync_paths(
        &self,
        paths: &BTreeSet<String>,
        metadata: &BTreeMap<String, ExifData>,
    ) -> Result<IndexSummary> {
        for path in paths {
            validate_relative_path(path).map_err(|message| LibraryError::InvalidInput {
                field: "path".to_string(),
                message,
            })?;
        }

        let existing = self.all_paths().await?;
        let mut summary = IndexSummary::default();
        let mut tx = self.pool.begin().await?;

        for path in paths.difference(&existing) {
            let photo = PhotoRecord::new(path.clone())
                .with_exif(metadata.get(path).cloned().unwrap_or_default());
            query(
                r#"
                INSERT INTO photos (path, filename, album, published, exif_data, created_at, updated_at)
                VALUES (?, ?, ?, 0, ?, ?, ?)
                "#,
            )
            .bind(&photo.path)
            .bind(&photo.filename)
            .bind(&photo.album)
            .bind(photo.exif_json())
            .bind(photo.created_at)
            .bind(photo.updated_at)
            .execute(&mut *tx)
            .await?;
            summary.added += 1;
        }

        let current: HashSet<&String> = paths.iter().collect();
        for path in existing.iter().filter(|p| !current.contains(p)) {
            query("DELETE FROM photos WHERE path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
            summary.removed += 1;
        }

        tx.commit().await?;

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::ExifData;

    async fn setup_repo() -> SqlitePhotoRepository {
        SqlitePhotoRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_photo() {
        let repo = setup_repo().await;

        let mut photo = PhotoRecord::new("iceland/falls.jpg").with_published(true);
        photo.tags = vec!["water".to_string()];
        photo.exif = ExifData::parse_lenient(Some(r#"{"width":1200,"height":800}"#));
        let id = repo.insert(&photo).await.unwrap();
        assert!(id > 0);

        let found = repo.find_by_path("iceland/falls.jpg").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.album.as_deref(), Some("iceland"));
        assert!(found.published);
        assert_eq!(found.tags, vec!["water"]);
        assert_eq!(found.exif.width, Some(1200));

        assert!(repo.find_by_path("missing.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_path_fails() {
        let repo = setup_repo().await;

        repo.insert(&PhotoRecord::new("a.jpg")).await.unwrap();
        let result = repo.insert(&PhotoRecord::new("a.jpg")).await;

        assert!(matches!(result, Err(LibraryError::Database(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_escaping_path() {
        let repo = setup_repo().await;

        let result = repo.insert(&PhotoRecord::new("../outside.jpg")).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let repo = setup_repo().await;
        let mut photo = PhotoRecord::new("a.jpg");
        photo.custom_title = Some("Old".to_string());
        photo.notes = Some("keep me".to_string());
        repo.insert(&photo).await.unwrap();

        let update = PhotoUpdate {
            published: Some(true),
            custom_title: Some(None),
            tags: Some(vec!["x".to_string(), "y".to_string()]),
            ..Default::default()
        };
        assert!(repo.update("a.jpg", &update).await.unwrap());

        let found = repo.find_by_path("a.jpg").await.unwrap().unwrap();
        assert!(found.published);
        assert!(found.custom_title.is_none());
        assert_eq!(found.tags, vec!["x", "y"]);
        assert_eq!(found.notes.as_deref(), Some("keep me"));
    }

    #[tokio::test]
    async fn test_update_missing_photo_returns_false() {
        let repo = setup_repo().await;
        let updated = repo
            .update("nope.jpg", &PhotoUpdate::publish(true))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let repo = setup_repo().await;
        let result = repo.update("a.jpg", &PhotoUpdate::default()).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_published_queries() {
        let repo = setup_repo().await;
        repo.insert(&PhotoRecord::new("a.jpg").with_published(true))
            .await
            .unwrap();
        repo.insert(&PhotoRecord::new("b/b.jpg").with_published(true))
            .await
            .unwrap();
        repo.insert(&PhotoRecord::new("c.jpg")).await.unwrap();

        let published = repo.list_published_paths().await.unwrap();
        assert_eq!(
            published,
            BTreeSet::from(["a.jpg".to_string(), "b/b.jpg".to_string()])
        );
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.count_published().await.unwrap(), 2);

        let rows = repo.published_rows().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.published));

        assert_eq!(repo.publish_all().await.unwrap(), 1);
        assert_eq!(repo.count_published().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_photo() {
        let repo = setup_repo().await;
        repo.insert(&PhotoRecord::new("a.jpg")).await.unwrap();

        assert!(repo.delete("a.jpg").await.unwrap());
        assert!(!repo.delete("a.jpg").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sync_paths_adds_and_removes() {
        let repo = setup_repo().await;
        repo.insert(&PhotoRecord::new("gone.jpg").with_published(true))
            .await
            .unwrap();
        repo.insert(&PhotoRecord::new("kept.jpg").with_published(true))
            .await
            .unwrap();

        let on_disk = BTreeSet::from([
            "kept.jpg".to_string(),
            "trip/new.jpg".to_string(),
        ]);
        let mut exif = ExifData::default();
        exif.width = Some(640);
        exif.height = Some(480);
        let metadata = BTreeMap::from([("trip/new.jpg".to_string(), exif)]);
        let summary = repo.sync_paths(&on_disk, &metadata).await.unwrap();

        assert_eq!(summary, IndexSummary { added: 1, removed: 1 });
        assert_eq!(repo.all_paths().await.unwrap(), on_disk);

        let kept = repo.find_by_path("kept.jpg").await.unwrap().unwrap();
        assert!(kept.published, "existing records keep their publish flag");
        let new = repo.find_by_path("trip/new.jpg").await.unwrap().unwrap();
        assert!(!new.published);
        assert_eq!(new.album.as_deref(), Some("trip"));
        assert_eq!((new.exif.width, new.exif.height), (Some(640), Some(480)));
        assert!(kept.exif.is_empty(), "existing records are left untouched");
    }

    #[tokio::test]
    async fn test_all_is_ordered_by_path() {
        let repo = setup_repo().await;
        for path in ["c.jpg", "a.jpg", "b.jpg"] {
            repo.insert(&PhotoRecord::new(path)).await.unwrap();
        }

        let paths: Vec<String> = repo.all().await.unwrap().into_iter().map(|p| p.path).collect();
        assert_eq!(paths, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }
}
