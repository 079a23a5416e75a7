//! Album repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::{AlbumRecord, AlbumUpdate};
use async_trait::async_trait;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool};

/// Album repository interface for data access operations
#[async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Find an album by its folder name
    ///
    /// # Returns
    /// - `Ok(Some(album))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_name(&self, name: &str) -> Result<Option<AlbumRecord>>;

    /// Insert a new album and return its database id
    ///
    /// # Errors
    /// Returns error if:
    /// - Album with same name already exists
    /// - Album validation fails
    /// - Database error occurs
    async fn insert(&self, album: &AlbumRecord) -> Result<i64>;

    /// Apply a partial update to the named album
    ///
    /// # Returns
    /// - `Ok(true)` if the album was updated
    /// - `Ok(false)` if no album has that name
    async fn update(&self, name: &str, update: &AlbumUpdate) -> Result<bool>;

    /// Delete an album by name
    ///
    /// Photos in the folder are untouched.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// Every album, ordered by sort order then name
    async fn all(&self) -> Result<Vec<AlbumRecord>>;
}

/// SQLite implementation of AlbumRepository
pub struct SqliteAlbumRepository {
    pool: SqlitePool,
}

impl SqliteAlbumRepository {
    /// Create a new SqliteAlbumRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlbumRepository for SqliteAlbumRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<AlbumRecord>> {
        let album = query_as::<_, AlbumRecord>("SELECT * FROM albums WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    async fn insert(&self, album: &AlbumRecord) -> Result<i64> {
        album.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Album".to_string(),
            message: e,
        })?;

        let result = query(
            r#"
            INSERT INTO albums (
                name, display_name, description, cover_photo_path,
                sort_order, published, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&album.name)
        .bind(&album.display_name)
        .bind(&album.description)
        .bind(&album.cover_photo_path)
        .bind(album.sort_order)
        .bind(album.published)
        .bind(album.created_at)
        .bind(album.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, name: &str, update: &AlbumUpdate) -> Result<bool> {
        if update.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "AlbumUpdate".to_string(),
                message: "Update must set at least one field".to_string(),
            });
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE albums SET ");
        let mut columns = builder.separated(", ");

        if let Some(display_name) = &update.display_name {
            columns
                .push("display_name = ")
                .push_bind_unseparated(display_name.clone());
        }
        if let Some(description) = &update.description {
            columns
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(cover) = &update.cover_photo_path {
            columns
                .push("cover_photo_path = ")
                .push_bind_unseparated(cover.clone());
        }
        if let Some(sort_order) = update.sort_order {
            columns.push("sort_order = ").push_bind_unseparated(sort_order);
        }
        if let Some(published) = update.published {
            columns.push("published = ").push_bind_unseparated(published);
        }
        columns
            .push("updated_at = ")
            .push_bind_unseparated(chrono::Utc::now().timestamp());

        builder.push(" WHERE name = ").push_bind(name);

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let result = query("DELETE FROM albums WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> Result<Vec<AlbumRecord>> {
        let albums =
            query_as::<_, AlbumRecord>("SELECT * FROM albums ORDER BY sort_order ASC, name ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(albums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteAlbumRepository {
        SqliteAlbumRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_insert_and_find_album() {
        let repo = setup_repo().await;

        let mut album = AlbumRecord::new("iceland");
        album.display_name = Some("Iceland 2023".to_string());
        repo.insert(&album).await.unwrap();

        let found = repo.find_by_name("iceland").await.unwrap().unwrap();
        assert_eq!(found.display_title(), "Iceland 2023");
        assert!(found.published);
        assert!(found.cover_photo_path.is_none());
    }

    #[tokio::test]
    async fn test_update_album() {
        let repo = setup_repo().await;
        repo.insert(&AlbumRecord::new("iceland")).await.unwrap();

        let update = AlbumUpdate {
            cover_photo_path: Some(Some("iceland/falls.jpg".to_string())),
            sort_order: Some(3),
            published: Some(false),
            ..Default::default()
        };
        assert!(repo.update("iceland", &update).await.unwrap());

        let found = repo.find_by_name("iceland").await.unwrap().unwrap();
        assert_eq!(found.cover_photo_path.as_deref(), Some("iceland/falls.jpg"));
        assert_eq!(found.sort_order, 3);
        assert!(!found.published);

        assert!(!repo.update("missing", &update).await.unwrap());
    }

    #[tokio::test]
    async fn test_album_without_photos_is_allowed() {
        let repo = setup_repo().await;
        repo.insert(&AlbumRecord::new("empty")).await.unwrap();
        assert_eq!(repo.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_album() {
        let repo = setup_repo().await;
        repo.insert(&AlbumRecord::new("iceland")).await.unwrap();

        assert!(repo.delete("iceland").await.unwrap());
        assert!(!repo.delete("iceland").await.unwrap());
    }

    #[tokio::test]
    async fn test_all_orders_by_sort_order_then_name() {
        let repo = setup_repo().await;
        for (name, order) in [("zeta", 0), ("alpha", 1), ("beta", 0)] {
            let mut album = AlbumRecord::new(name);
            album.sort_order = order;
            repo.insert(&album).await.unwrap();
        }

        let names: Vec<String> = repo.all().await.unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["beta", "zeta", "alpha"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_fails() {
        let repo = setup_repo().await;
        repo.insert(&AlbumRecord::new("iceland")).await.unwrap();
        assert!(repo.insert(&AlbumRecord::new("iceland")).await.is_err());
    }
}
