//! # Local Photo Library
//!
//! Read access to the tree of original images under the photos root.
//!
//! Relative paths are the catalog's identity for a photo: they key the
//! `photos` table, the local thumbnail cache, and the remote objects. They are
//! always forward-slash separated, never absolute, and never climb out of the
//! root.

use crate::error::{LibraryError, Result};
use crate::media::{is_reserved_key, is_supported_image};
use crate::metadata::read_photo_metadata;
use crate::models::{validate_relative_path, ExifData};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Original image tree rooted at the configured photos directory.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a relative photo path.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty, absolute or `..` paths.
    pub fn original_path(&self, relative: &str) -> Result<PathBuf> {
        validate_relative_path(relative).map_err(|message| LibraryError::InvalidInput {
            field: "path".to_string(),
            message,
        })?;

        Ok(self.root.join(relative))
    }

    /// Whether the original for `relative` exists as a regular file.
    ///
    /// Invalid paths are reported as missing.
    pub async fn exists(&self, relative: &str) -> bool {
        let Ok(path) = self.original_path(relative) else {
            return false;
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.is_file(),
            Err(_) => false,
        }
    }

    /// Dimensions and EXIF attributes of the original at `relative`.
    pub async fn read_metadata(&self, relative: &str) -> Result<ExifData> {
        let path = self.original_path(relative)?;
        tokio::task::spawn_blocking(move || read_photo_metadata(&path))
            .await
            .map_err(|e| LibraryError::Io(std::io::Error::other(e)))
    }

    /// Relative paths of every supported image under the root.
    ///
    /// Hidden files and directories are skipped, as are the reserved
    /// `thumbnails/` and `metadata/` top-level folders. A missing root yields
    /// an empty set.
    pub async fn list_files(&self) -> Result<BTreeSet<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_images(&root))
            .await
            .map_err(|e| LibraryError::Io(std::io::Error::other(e)))?
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

/// Top-level folders whose names collide with the remote derived namespaces.
fn is_reserved_folder(entry: &DirEntry) -> bool {
    let reserved = entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| is_reserved_key(&format!("{}/", name)))
            .unwrap_or(false);
    if reserved {
        warn!(folder = %entry.path().display(), "Skipping reserved folder");
    }
    reserved
}

fn scan_images(root: &Path) -> Result<BTreeSet<String>> {
    let mut found = BTreeSet::new();

    if !root.exists() {
        debug!(root = %root.display(), "Photos root does not exist");
        return Ok(found);
    }

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_reserved_folder(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(relative) = relative_key(root, entry.path()) else {
            continue;
        };

        if is_supported_image(&relative) {
            found.insert(relative);
        }
    }

    Ok(found)
}

/// Forward-slash relative key of `path` under `root`.
///
/// Returns `None` when `path` is outside `root` or is not valid UTF-8.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_list_files_filters_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("iceland/day1")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("portrait.PNG"), b"x").unwrap();
        fs::write(root.join("iceland/day1/falls.jpg"), b"x").unwrap();
        fs::write(root.join("iceland/notes.txt"), b"x").unwrap();
        fs::write(root.join(".cache/hidden.jpg"), b"x").unwrap();
        fs::write(root.join(".DS_Store"), b"x").unwrap();

        let files = LocalLibrary::new(root).list_files().await.unwrap();

        assert_eq!(
            files,
            BTreeSet::from([
                "iceland/day1/falls.jpg".to_string(),
                "portrait.PNG".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn test_list_files_skips_reserved_folders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for folder in ["thumbnails", "metadata", "trips/thumbnails"] {
            fs::create_dir_all(root.join(folder)).unwrap();
            fs::write(root.join(folder).join("x.jpg"), b"x").unwrap();
        }

        let files = LocalLibrary::new(root).list_files().await.unwrap();

        assert_eq!(
            files,
            BTreeSet::from(["trips/thumbnails/x.jpg".to_string()]),
            "only top-level folders are reserved"
        );
    }

    #[tokio::test]
    async fn test_read_metadata() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("album")).unwrap();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(30, 60))
            .save(dir.path().join("album/tall.png"))
            .unwrap();
        let library = LocalLibrary::new(dir.path());

        let exif = library.read_metadata("album/tall.png").await.unwrap();
        assert_eq!((exif.width, exif.height), (Some(30), Some(60)));
        assert_eq!(exif.aspect_ratio, Some(0.5));
        assert!(library.read_metadata("../escape.png").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let library = LocalLibrary::new(dir.path().join("absent"));
        assert!(library.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exists() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("album")).unwrap();
        fs::write(dir.path().join("album/a.jpg"), b"x").unwrap();
        let library = LocalLibrary::new(dir.path());

        assert!(library.exists("album/a.jpg").await);
        assert!(!library.exists("album/b.jpg").await);
        assert!(!library.exists("album").await, "directories are not photos");
        assert!(!library.exists("../a.jpg").await);
    }

    #[test]
    fn test_original_path_rejects_escape() {
        let library = LocalLibrary::new("/srv/photos");
        assert_eq!(
            library.original_path("a/b.jpg").unwrap(),
            PathBuf::from("/srv/photos/a/b.jpg")
        );
        assert!(library.original_path("/etc/passwd").is_err());
        assert!(library.original_path("a/../../b.jpg").is_err());
    }

    #[test]
    fn test_relative_key() {
        let root = Path::new("/srv/photos");
        assert_eq!(
            relative_key(root, Path::new("/srv/photos/a/b.jpg")).as_deref(),
            Some("a/b.jpg")
        );
        assert_eq!(relative_key(root, Path::new("/srv/other/b.jpg")), None);
        assert_eq!(relative_key(root, root), None);
    }
}
