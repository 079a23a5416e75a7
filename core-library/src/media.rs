//! Object key layout and content types.
//!
//! Originals are stored under their relative path. Derived objects live in
//! reserved top-level namespaces that never collide with a photo key.

/// Namespace of derived thumbnails, mirroring original keys.
pub const THUMBNAIL_PREFIX: &str = "thumbnails/";

/// Namespace of catalog metadata objects.
pub const METADATA_PREFIX: &str = "metadata/";

/// Key of the published-photos snapshot.
pub const SNAPSHOT_KEY: &str = "metadata/published.db";

/// Thumbnails are always JPEG regardless of the original's format.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

pub const SNAPSHOT_CONTENT_TYPE: &str = "application/x-sqlite3";

/// Consumers must always revalidate the snapshot.
pub const SNAPSHOT_CACHE_CONTROL: &str = "no-cache";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Extensions (lowercase, without dot) recognised as photos.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Remote key of the thumbnail for an original key.
pub fn thumbnail_key(path: &str) -> String {
    format!("{}{}", THUMBNAIL_PREFIX, path)
}

/// Original key a thumbnail key was derived from, `None` for other keys.
pub fn original_key_for_thumbnail(key: &str) -> Option<&str> {
    key.strip_prefix(THUMBNAIL_PREFIX).filter(|rest| !rest.is_empty())
}

/// Whether a remote key belongs to a derived namespace rather than an original.
///
/// A photo path for which this holds could never be told apart from derived
/// objects once uploaded, so such paths are not catalogued or published.
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(THUMBNAIL_PREFIX) || key.starts_with(METADATA_PREFIX)
}

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type for an original, chosen by extension (case-insensitive).
pub fn content_type_for(path: &str) -> &'static str {
    match extension_of(path).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Whether a file name has a supported photo extension.
pub fn is_supported_image(path: &str) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("a/b.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a/b.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("b.png"), "image/png");
        assert_eq!(content_type_for("b.gif"), "image/gif");
        assert_eq!(content_type_for("b.WebP"), "image/webp");
        assert_eq!(content_type_for("b.tiff"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(content_type_for(".jpg"), "application/octet-stream");
    }

    #[test]
    fn test_thumbnail_key_round_trip() {
        let key = thumbnail_key("iceland/falls.png");
        assert_eq!(key, "thumbnails/iceland/falls.png");
        assert_eq!(original_key_for_thumbnail(&key), Some("iceland/falls.png"));
        assert_eq!(original_key_for_thumbnail("iceland/falls.png"), None);
        assert_eq!(original_key_for_thumbnail("thumbnails/"), None);
    }

    #[test]
    fn test_reserved_keys() {
        assert!(is_reserved_key("thumbnails/a.jpg"));
        assert!(is_reserved_key(SNAPSHOT_KEY));
        assert!(!is_reserved_key("album/a.jpg"));
        assert!(!is_reserved_key("thumbnails.jpg"));
    }

    #[test]
    fn test_supported_images() {
        assert!(is_supported_image("a/B.JPG"));
        assert!(is_supported_image("x.webp"));
        assert!(!is_supported_image("notes.txt"));
        assert!(!is_supported_image("README"));
    }
}
