//! # Catalog Configuration Module
//!
//! Provides configuration management for the photo catalog publisher.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `CatalogConfig` instance that holds every path and setting the catalog
//! needs. It enforces fail-fast validation so a misconfigured deployment stops
//! at startup instead of halfway through a reconciliation pass.
//!
//! ## Required Settings
//!
//! - `photos_dir` - Root of the original image tree
//! - `database_path` - SQLite metadata database
//!
//! ## Optional Settings (with defaults)
//!
//! - `thumbnails_dir` - Local thumbnail cache (default: `thumbnails` next to `photos_dir`)
//! - `object_store` - Bucket credentials; without them reconciliation reports
//!   a configuration error and does no work
//! - `use_cdn` - Serve from the bucket and bootstrap from the published snapshot
//! - `thumbnail` - Size, quality and concurrency of thumbnail generation
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::config::{CatalogConfig, ObjectStoreCredentials};
//!
//! let config = CatalogConfig::builder()
//!     .photos_dir("/srv/catalog/photos")
//!     .database_path("/srv/catalog/photos.db")
//!     .object_store(ObjectStoreCredentials::new(
//!         "access-key",
//!         "secret-key",
//!         "photos",
//!         "https://account.r2.cloudflarestorage.com",
//!     ))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Environment
//!
//! [`CatalogConfig::from_env`] reads `PHOTOS_DIR`, `THUMBNAILS_DIR`,
//! `DATABASE_PATH`, `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`,
//! `R2_BUCKET_NAME`, `R2_ENDPOINT_URL`, `USE_CDN`, `THUMBNAIL_SIZE`,
//! `THUMBNAIL_QUALITY` and `THUMBNAIL_WORKERS`.

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use std::path::{Path, PathBuf};

const DEFAULT_PHOTOS_DIR: &str = "photos";
const DEFAULT_DATABASE_PATH: &str = "photos.db";

/// Credentials and location of the S3-compatible bucket.
#[derive(Clone, PartialEq, Eq)]
pub struct ObjectStoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub endpoint: String,
    /// Signing region. R2 accepts `auto`.
    pub region: String,
}

impl ObjectStoreCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            endpoint: endpoint.into(),
            region: "auto".to_string(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Credentials count as configured once an access key is present.
    pub fn is_configured(&self) -> bool {
        !self.access_key_id.trim().is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.secret_access_key.trim().is_empty() {
            return Err(Error::Config(
                "R2_ACCESS_KEY_ID is set but R2_SECRET_ACCESS_KEY is empty. \
                 Provide both keys or neither."
                    .to_string(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::Config(
                "Object store credentials require a bucket name (R2_BUCKET_NAME)".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config(
                "Object store credentials require an endpoint URL (R2_ENDPOINT_URL)".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ObjectStoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreCredentials")
            .field(
                "access_key_id",
                &redact_if_sensitive("access_key_id", &self.access_key_id),
            )
            .field(
                "secret_access_key",
                &redact_if_sensitive("secret_access_key", &self.secret_access_key),
            )
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish()
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSettings {
    /// Longest allowed side in pixels
    pub max_dimension: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Upper bound on concurrent decode/resize/encode jobs
    pub max_concurrent_generations: usize,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_dimension: 400,
            jpeg_quality: 85,
            max_concurrent_generations: 4,
        }
    }
}

impl ThumbnailSettings {
    fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(Error::Config(
                "Thumbnail size must be greater than 0 pixels".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::Config(format!(
                "Thumbnail quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_concurrent_generations == 0 {
            return Err(Error::Config(
                "Thumbnail worker count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Catalog configuration.
///
/// Use [`CatalogConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Root of the original image tree
    pub photos_dir: PathBuf,

    /// Local thumbnail cache, mirroring the layout of `photos_dir`
    pub thumbnails_dir: PathBuf,

    /// Path to the SQLite metadata database
    pub database_path: PathBuf,

    /// Bucket credentials, `None` when not configured
    pub object_store: Option<ObjectStoreCredentials>,

    /// Serve originals from the bucket and bootstrap from the published snapshot
    pub use_cdn: bool,

    /// Thumbnail generation settings
    pub thumbnail: ThumbnailSettings,
}

impl CatalogConfig {
    /// Creates a new builder for constructing a `CatalogConfig`.
    pub fn builder() -> CatalogConfigBuilder {
        CatalogConfigBuilder::default()
    }

    /// Builds a configuration from process environment variables.
    ///
    /// Missing paths fall back to `photos` and `photos.db` relative to the
    /// working directory.
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable cannot be parsed or the
    /// resulting configuration fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// [`from_env`](Self::from_env) is this function over `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = CatalogConfig::builder()
            .photos_dir(get("PHOTOS_DIR").unwrap_or_else(|| DEFAULT_PHOTOS_DIR.to_string()))
            .database_path(
                get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            );

        if let Some(dir) = get("THUMBNAILS_DIR") {
            builder = builder.thumbnails_dir(dir);
        }

        if let Some(access_key_id) = get("R2_ACCESS_KEY_ID") {
            builder = builder.object_store(ObjectStoreCredentials::new(
                access_key_id,
                get("R2_SECRET_ACCESS_KEY").unwrap_or_default(),
                get("R2_BUCKET_NAME").unwrap_or_default(),
                get("R2_ENDPOINT_URL").unwrap_or_default(),
            ));
        }

        if let Some(flag) = get("USE_CDN") {
            builder = builder.use_cdn(parse_bool("USE_CDN", &flag)?);
        }

        let mut thumbnail = ThumbnailSettings::default();
        if let Some(size) = get("THUMBNAIL_SIZE") {
            thumbnail.max_dimension = parse_number("THUMBNAIL_SIZE", &size)?;
        }
        if let Some(quality) = get("THUMBNAIL_QUALITY") {
            thumbnail.jpeg_quality = parse_number("THUMBNAIL_QUALITY", &quality)?;
        }
        if let Some(workers) = get("THUMBNAIL_WORKERS") {
            thumbnail.max_concurrent_generations = parse_number("THUMBNAIL_WORKERS", &workers)?;
        }

        builder.thumbnail(thumbnail).build()
    }

    /// Returns the configured credentials when they are usable.
    pub fn credentials(&self) -> Option<&ObjectStoreCredentials> {
        self.object_store.as_ref().filter(|c| c.is_configured())
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Paths are not empty
    /// - The thumbnail cache and the photo tree are disjoint
    /// - Thumbnail settings are in range
    /// - Credentials, when present, name a bucket and endpoint
    pub fn validate(&self) -> Result<()> {
        if self.photos_dir.as_os_str().is_empty() {
            return Err(Error::Config("Photos directory cannot be empty".to_string()));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.thumbnails_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "Thumbnails directory cannot be empty".to_string(),
            ));
        }

        if self.thumbnails_dir.starts_with(&self.photos_dir)
            || self.photos_dir.starts_with(&self.thumbnails_dir)
        {
            return Err(Error::Config(
                "Thumbnails directory and photos directory must not contain each other; \
                 cached thumbnails would be indexed as photos and orphan cleanup \
                 would delete originals"
                    .to_string(),
            ));
        }

        self.thumbnail.validate()?;

        if let Some(credentials) = self.credentials() {
            credentials.validate()?;
        }

        Ok(())
    }
}

/// Default thumbnail cache location: a `thumbnails` sibling of the photo tree.
pub fn default_thumbnails_dir(photos_dir: &Path) -> PathBuf {
    match photos_dir.parent() {
        Some(parent) => parent.join("thumbnails"),
        None => PathBuf::from("thumbnails"),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "{} must be a boolean (true/false), got '{}'",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value)))
}

/// Builder for [`CatalogConfig`].
#[derive(Default)]
pub struct CatalogConfigBuilder {
    photos_dir: Option<PathBuf>,
    thumbnails_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    object_store: Option<ObjectStoreCredentials>,
    use_cdn: bool,
    thumbnail: Option<ThumbnailSettings>,
}

impl CatalogConfigBuilder {
    /// Sets the root of the original image tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CatalogConfig;
    ///
    /// let builder = CatalogConfig::builder()
    ///     .photos_dir("/srv/catalog/photos");
    /// ```
    pub fn photos_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.photos_dir = Some(path.into());
        self
    }

    /// Sets the thumbnail cache directory.
    ///
    /// Default: `thumbnails` next to the photos directory.
    pub fn thumbnails_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.thumbnails_dir = Some(path.into());
        self
    }

    /// Sets the SQLite database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the bucket credentials.
    pub fn object_store(mut self, credentials: ObjectStoreCredentials) -> Self {
        self.object_store = Some(credentials);
        self
    }

    /// Enables CDN mode.
    pub fn use_cdn(mut self, enabled: bool) -> Self {
        self.use_cdn = enabled;
        self
    }

    /// Overrides the thumbnail settings.
    pub fn thumbnail(mut self, settings: ThumbnailSettings) -> Self {
        self.thumbnail = Some(settings);
        self
    }

    /// Builds the final `CatalogConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CatalogConfig)` on success, or an error if:
    /// - `photos_dir` or `database_path` is missing
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CatalogConfig> {
        let photos_dir = self.photos_dir.ok_or_else(|| {
            Error::Config("Photos directory is required. Use .photos_dir() to set it.".to_string())
        })?;

        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let thumbnails_dir = self
            .thumbnails_dir
            .unwrap_or_else(|| default_thumbnails_dir(&photos_dir));

        let config = CatalogConfig {
            photos_dir,
            thumbnails_dir,
            database_path,
            object_store: self.object_store,
            use_cdn: self.use_cdn,
            thumbnail: self.thumbnail.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
