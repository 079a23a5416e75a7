//! Thumbnail Service - Generate, Cache and Prune Photo Previews
//!
//! The cache mirrors the photo tree: the thumbnail of `album/photo.png` lives
//! at `<thumbnails_dir>/album/photo.png` and always holds JPEG data, whatever
//! the extension says.
//!
//! ## Overview
//!
//! - [`ThumbnailService::ensure`] is idempotent: an existing thumbnail is
//!   reused without touching the source unless `force` is set
//! - Generation runs on the blocking pool, bounded by a semaphore
//! - [`ThumbnailService::cleanup_orphaned`] removes cache entries for photos
//!   that are no longer wanted
//!
//! ## Usage
//!
//! ```ignore
//! use core_thumbnail::{ThumbnailConfig, ThumbnailService};
//!
//! let service = ThumbnailService::new(ThumbnailConfig::new("photos", "thumbnails"));
//! if let Some(handle) = service.ensure("iceland/falls.jpg", false).await {
//!     println!("thumbnail at {} (generated: {})", handle.path.display(), handle.generated);
//! }
//! ```

use crate::error::{Result, ThumbnailError};
use crate::render::{render_thumbnail, write_atomically};
use core_library::library::relative_key;
use core_library::models::validate_relative_path;
use core_runtime::config::CatalogConfig;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Thumbnail service configuration
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Root of the original image tree
    pub photos_dir: PathBuf,
    /// Root of the thumbnail cache
    pub thumbnails_dir: PathBuf,
    /// Longest allowed side in pixels
    pub max_dimension: u32,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// Maximum number of thumbnails rendered at once
    pub max_concurrent_generations: usize,
}

impl ThumbnailConfig {
    pub fn new(photos_dir: impl Into<PathBuf>, thumbnails_dir: impl Into<PathBuf>) -> Self {
        Self {
            photos_dir: photos_dir.into(),
            thumbnails_dir: thumbnails_dir.into(),
            max_dimension: 400,
            jpeg_quality: 85,
            max_concurrent_generations: 4,
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_max_concurrent_generations(mut self, workers: usize) -> Self {
        self.max_concurrent_generations = workers;
        self
    }
}

impl From<&CatalogConfig> for ThumbnailConfig {
    fn from(config: &CatalogConfig) -> Self {
        ThumbnailConfig::new(&config.photos_dir, &config.thumbnails_dir)
            .with_max_dimension(config.thumbnail.max_dimension)
            .with_jpeg_quality(config.thumbnail.jpeg_quality)
            .with_max_concurrent_generations(config.thumbnail.max_concurrent_generations)
    }
}

/// A thumbnail present in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailHandle {
    /// Location of the cached JPEG
    pub path: PathBuf,
    /// `true` when this call rendered it, `false` on a cache hit
    pub generated: bool,
}

/// Counts from a bulk generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

/// Thumbnail service for the local preview cache
pub struct ThumbnailService {
    config: ThumbnailConfig,
    permits: Arc<Semaphore>,
}

impl ThumbnailService {
    /// Create a new ThumbnailService
    ///
    /// A worker limit of zero is treated as one.
    pub fn new(config: ThumbnailConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_generations.max(1)));
        Self { config, permits }
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    /// Cache location for the thumbnail of a relative photo path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPath` for empty, absolute or `..` paths.
    pub fn thumbnail_path(&self, relative: &str) -> Result<PathBuf> {
        validate_relative_path(relative).map_err(ThumbnailError::InvalidPath)?;
        Ok(self.config.thumbnails_dir.join(relative))
    }

    /// Whether a cached thumbnail exists for `relative`.
    pub async fn has_thumbnail(&self, relative: &str) -> bool {
        match self.thumbnail_path(relative) {
            Ok(path) => is_file(&path).await,
            Err(_) => false,
        }
    }

    /// Return the cached thumbnail, rendering it first if needed.
    ///
    /// Failures are logged and reported as `None`.
    pub async fn ensure(&self, relative: &str, force: bool) -> Option<ThumbnailHandle> {
        match self.generate(relative, force).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(path = relative, error = %e, "Thumbnail unavailable");
                None
            }
        }
    }

    /// Fallible form of [`ensure`](Self::ensure).
    ///
    /// # Errors
    ///
    /// - `InvalidPath` when `relative` is not a safe relative path
    /// - `SourceNotFound` when the original does not exist
    /// - `Image` / `Io` when decoding, encoding or writing fails
    #[instrument(skip(self), level = "debug")]
    pub async fn generate(&self, relative: &str, force: bool) -> Result<ThumbnailHandle> {
        let target = self.thumbnail_path(relative)?;

        if !force && is_file(&target).await {
            debug!(path = relative, "Thumbnail cache hit");
            return Ok(ThumbnailHandle {
                path: target,
                generated: false,
            });
        }

        let source = self.config.photos_dir.join(relative);
        if !is_file(&source).await {
            return Err(ThumbnailError::SourceNotFound(relative.to_string()));
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ThumbnailError::Task("Thumbnail worker pool closed".to_string()))?;

        let max_dimension = self.config.max_dimension;
        let quality = self.config.jpeg_quality;
        let destination = target.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            let thumb = render_thumbnail(&source, max_dimension, quality)?;
            write_atomically(&destination, &thumb.bytes)?;
            Ok::<_, ThumbnailError>(thumb)
        })
        .await
        .map_err(|e| ThumbnailError::Task(e.to_string()))??;

        debug!(
            path = relative,
            width = rendered.width,
            height = rendered.height,
            bytes = rendered.bytes.len(),
            "Generated thumbnail"
        );

        Ok(ThumbnailHandle {
            path: target,
            generated: true,
        })
    }

    /// Remove the cached thumbnail for `relative`.
    ///
    /// Returns `true` if a file was removed.
    pub async fn delete(&self, relative: &str) -> bool {
        let Ok(path) = self.thumbnail_path(relative) else {
            return false;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = relative, "Deleted thumbnail");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = relative, error = %e, "Failed to delete thumbnail");
                false
            }
        }
    }

    /// Remove cached thumbnails whose photo path is not in `valid_paths`.
    ///
    /// Directories emptied by the sweep are pruned. Returns the number of
    /// thumbnails removed.
    #[instrument(skip(self, valid_paths), fields(valid = valid_paths.len()))]
    pub async fn cleanup_orphaned(&self, valid_paths: &BTreeSet<String>) -> usize {
        let root = self.config.thumbnails_dir.clone();
        let valid = valid_paths.clone();

        let result = tokio::task::spawn_blocking(move || sweep_cache(&root, &valid)).await;

        match result {
            Ok(removed) => {
                if removed > 0 {
                    info!(removed, "Removed orphaned thumbnails");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "Thumbnail cleanup task failed");
                0
            }
        }
    }

    /// Ensure a thumbnail for every path, `force` re-rendering existing ones.
    #[instrument(skip(self, paths), fields(total = paths.len()))]
    pub async fn generate_all(&self, paths: &BTreeSet<String>, force: bool) -> GenerationSummary {
        let results = join_all(paths.iter().map(|path| self.generate(path, force))).await;

        let mut summary = GenerationSummary {
            total: paths.len(),
            ..Default::default()
        };

        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(handle) if handle.generated => summary.generated += 1,
                Ok(_) => summary.skipped += 1,
                Err(e) => {
                    warn!(path = %path, error = %e, "Thumbnail generation failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "Bulk thumbnail generation finished"
        );

        summary
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn sweep_cache(root: &Path, valid: &BTreeSet<String>) -> usize {
    if !root.exists() {
        return 0;
    }

    let mut removed = 0;
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable cache entry");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            // Only succeeds on empty directories
            if entry.depth() > 0 {
                let _ = std::fs::remove_dir(entry.path());
            }
            continue;
        }

        let keep = relative_key(root, entry.path())
            .map(|key| valid.contains(&key))
            .unwrap_or(false);
        if keep {
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(file = %entry.path().display(), "Removed orphaned thumbnail");
                removed += 1;
            }
            Err(e) => warn!(file = %entry.path().display(), error = %e, "Failed to remove thumbnail"),
        }
    }

    removed
}
