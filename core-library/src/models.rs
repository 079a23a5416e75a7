//! Domain models for the photo catalog
//!
//! This module contains the photo and album records with validation and
//! database mapping. JSON-encoded columns (`tags`, `exif_data`) are kept as
//! opaque text in [`PhotoRow`] and parsed into typed values in
//! [`PhotoRecord`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// Photo
// =============================================================================

/// Raw `photos` row exactly as stored.
///
/// Used where columns must travel verbatim, e.g. when copying rows into a
/// published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PhotoRow {
    pub id: i64,
    pub path: String,
    pub filename: String,
    pub album: Option<String>,
    pub published: bool,
    pub custom_title: Option<String>,
    pub description: Option<String>,
    /// JSON array text
    pub tags: Option<String>,
    pub notes: Option<String>,
    /// JSON object text
    pub exif_data: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// EXIF attributes cached for a photo.
///
/// Dimensions are typed; camera, lens and exposure values are kept as
/// whatever JSON the extractor produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExifData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<f64>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl ExifData {
    /// Parses stored JSON, yielding an empty bag for missing or malformed text.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        raw.filter(|s| !s.trim().is_empty())
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.aspect_ratio.is_none()
            && self.attributes.is_empty()
    }

    /// Camera model, if recorded.
    pub fn camera(&self) -> Option<&str> {
        self.text("camera")
    }

    /// Lens model, if recorded.
    pub fn lens(&self) -> Option<&str> {
        self.text("lens")
    }

    /// Capture timestamp as written by the camera, if recorded.
    pub fn date_taken(&self) -> Option<&str> {
        self.text("date_taken")
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| *v != "Unknown")
    }

    fn to_json(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            serde_json::to_string(self).ok()
        }
    }
}

/// Photo metadata keyed by its path relative to the photos root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Database identifier (0 until inserted)
    pub id: i64,
    /// Relative path, forward-slash separated; unique
    pub path: String,
    pub filename: String,
    /// Top-level folder name, `None` for photos at the root
    pub album: Option<String>,
    pub published: bool,
    pub custom_title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub exif: ExifData,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl PhotoRecord {
    /// Create an unpublished record for a relative path.
    ///
    /// Filename and album are derived from the path.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let now = chrono::Utc::now().timestamp();
        Self {
            id: 0,
            filename: filename_of(&path),
            album: album_of(&path),
            path,
            published: false,
            custom_title: None,
            description: None,
            tags: Vec::new(),
            notes: None,
            exif: ExifData::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn with_exif(mut self, exif: ExifData) -> Self {
        self.exif = exif;
        self
    }

    /// Validate photo data
    pub fn validate(&self) -> Result<(), String> {
        validate_relative_path(&self.path)?;

        if self.filename.trim().is_empty() {
            return Err("Photo filename cannot be empty".to_string());
        }

        Ok(())
    }

    /// Title to display: the custom title when set, the filename otherwise.
    pub fn display_title(&self) -> &str {
        self.custom_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.filename)
    }

    pub(crate) fn tags_json(&self) -> Option<String> {
        encode_tags(&self.tags)
    }

    pub(crate) fn exif_json(&self) -> Option<String> {
        self.exif.to_json()
    }
}

impl From<PhotoRow> for PhotoRecord {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: row.id,
            tags: parse_tags_lenient(row.tags.as_deref()),
            exif: ExifData::parse_lenient(row.exif_data.as_deref()),
            path: row.path,
            filename: row.filename,
            album: row.album,
            published: row.published,
            custom_title: row.custom_title,
            description: row.description,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial update for a photo.
///
/// `None` leaves a column untouched. For nullable columns `Some(None)` clears
/// the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoUpdate {
    pub published: Option<bool>,
    pub custom_title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
    pub album: Option<Option<String>>,
    pub filename: Option<String>,
}

impl PhotoUpdate {
    pub fn publish(published: bool) -> Self {
        Self {
            published: Some(published),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// Album
// =============================================================================

/// Album metadata keyed by folder name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AlbumRecord {
    pub id: i64,
    /// Top-level folder name; unique
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Relative path of the cover photo; not enforced as a foreign key
    pub cover_photo_path: Option<String>,
    pub sort_order: i64,
    pub published: bool,
    /// Timestamps
    pub created_at: i64,
    pub updated_at: i64,
}

impl AlbumRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: 0,
            name: name.into(),
            display_name: None,
            description: None,
            cover_photo_path: None,
            sort_order: 0,
            published: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate album data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Album name cannot be empty".to_string());
        }

        if self.name.contains('/') {
            return Err(format!(
                "Album name '{}' must be a single folder name",
                self.name
            ));
        }

        Ok(())
    }

    pub fn display_title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// Partial update for an album. Same conventions as [`PhotoUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumUpdate {
    pub display_name: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub cover_photo_path: Option<Option<String>>,
    pub sort_order: Option<i64>,
    pub published: Option<bool>,
}

impl AlbumUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// =============================================================================
// Path helpers
// =============================================================================

/// Rejects empty, absolute and parent-escaping relative paths.
pub fn validate_relative_path(path: &str) -> Result<(), String> {
    if path.trim().is_empty() {
        return Err("Photo path cannot be empty".to_string());
    }

    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).is_absolute() {
        return Err(format!("Photo path '{}' must be relative", path));
    }

    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("Photo path '{}' must not contain '..'", path));
    }

    Ok(())
}

/// Album name for a relative path: its first segment when nested.
pub fn album_of(path: &str) -> Option<String> {
    let mut parts = path.splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(first), Some(_)) if !first.is_empty() => Some(first.to_string()),
        _ => None,
    }
}

fn filename_of(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

pub(crate) fn encode_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        serde_json::to_string(tags).ok()
    }
}

fn parse_tags_lenient(raw: Option<&str>) -> Vec<String> {
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}
