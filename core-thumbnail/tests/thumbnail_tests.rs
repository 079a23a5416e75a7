//! Integration tests for the thumbnail cache
//!
//! Exercises the public service API against real files in a temp directory.

use core_thumbnail::{ThumbnailConfig, ThumbnailService};
use image::{DynamicImage, Rgba, RgbaImage};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

fn write_png(root: &Path, relative: &str, width: u32, height: u32) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255])))
        .save(&path)
        .unwrap();
}

#[tokio::test]
async fn test_bulk_generation_with_single_worker() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    let thumbs = dir.path().join("thumbnails");

    let mut paths = BTreeSet::new();
    for i in 0..6 {
        let relative = format!("album{}/photo{}.png", i % 2, i);
        write_png(&photos, &relative, 900, 300);
        paths.insert(relative);
    }

    let service = ThumbnailService::new(
        ThumbnailConfig::new(&photos, &thumbs)
            .with_max_dimension(120)
            .with_max_concurrent_generations(1),
    );

    let summary = service.generate_all(&paths, false).await;
    assert_eq!(summary.generated, 6);
    assert_eq!(summary.failed, 0);

    for relative in &paths {
        let bytes = std::fs::read(thumbs.join(relative)).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 40));
    }

    let again = service.generate_all(&paths, false).await;
    assert_eq!(again.skipped, 6);
    assert_eq!(again.generated, 0);
}

#[tokio::test]
async fn test_concurrent_ensure_of_same_path() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    let thumbs = dir.path().join("thumbnails");
    write_png(&photos, "shared.png", 64, 64);

    let service = Arc::new(ThumbnailService::new(ThumbnailConfig::new(&photos, &thumbs)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.ensure("shared.png", true).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    let bytes = std::fs::read(thumbs.join("shared.png")).unwrap();
    assert!(image::load_from_memory(&bytes).is_ok(), "file is never torn");
}

#[tokio::test]
async fn test_corrupt_original_is_reported_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    let thumbs = dir.path().join("thumbnails");
    std::fs::create_dir_all(&photos).unwrap();
    std::fs::write(photos.join("broken.jpg"), b"not a jpeg").unwrap();

    let service = ThumbnailService::new(ThumbnailConfig::new(&photos, &thumbs));

    assert!(service.ensure("broken.jpg", false).await.is_none());
    assert!(!service.has_thumbnail("broken.jpg").await);
}
