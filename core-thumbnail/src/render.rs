//! Decode, normalize and encode a single thumbnail.
//!
//! Everything here is synchronous and CPU-bound; callers run it on the
//! blocking pool.

use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Encoded thumbnail and its final dimensions.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Render the thumbnail of `source`.
///
/// The embedded EXIF orientation is applied first so the preview is upright.
/// Images with an alpha channel are composited onto white, then the result is
/// shrunk with Lanczos3 so neither side exceeds `max_dimension`. Smaller
/// images keep their size. Output is baseline JPEG at `quality`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the format is unknown or
/// the image fails to decode or encode.
pub fn render_thumbnail(source: &Path, max_dimension: u32, quality: u8) -> Result<RenderedThumbnail> {
    let mut decoder = ImageReader::open(source)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);

    let mut image = DynamicImage::from_decoder(decoder)?;
    image.apply_orientation(orientation);

    let flattened = flatten_onto_white(image);
    let resized = fit_within(flattened, max_dimension);

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    resized.write_with_encoder(encoder)?;

    Ok(RenderedThumbnail {
        width: resized.width(),
        height: resized.height(),
        bytes,
    })
}

/// Convert to 8-bit RGB, blending any transparency against white.
fn flatten_onto_white(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let rgb = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    });

    DynamicImage::ImageRgb8(rgb)
}

/// Shrink so both sides are at most `max_dimension`, preserving aspect ratio.
fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Write `bytes` to `target` through a sibling temporary file.
///
/// Readers never observe a partially written thumbnail.
pub(crate) fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(target).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn save_png(dir: &Path, name: &str, image: DynamicImage) -> std::path::PathBuf {
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn test_large_image_is_bounded_and_keeps_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let source = save_png(
            dir.path(),
            "wide.png",
            DynamicImage::ImageRgb8(RgbImage::from_pixel(1200, 600, image::Rgb([10, 20, 30]))),
        );

        let thumb = render_thumbnail(&source, 400, 85).unwrap();

        assert_eq!((thumb.width, thumb.height), (400, 200));
        let decoded = image::load_from_memory(&thumb.bytes).unwrap();
        assert_eq!(decoded.width(), 400);
        assert_eq!(
            image::guess_format(&thumb.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let source = save_png(
            dir.path(),
            "small.png",
            DynamicImage::ImageRgb8(RgbImage::new(120, 80)),
        );

        let thumb = render_thumbnail(&source, 400, 85).unwrap();
        assert_eq!((thumb.width, thumb.height), (120, 80));
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let dir = tempfile::tempdir().unwrap();
        let source = save_png(
            dir.path(),
            "clear.png",
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 0]))),
        );

        let thumb = render_thumbnail(&source, 400, 95).unwrap();
        let decoded = image::load_from_memory(&thumb.bytes).unwrap().to_rgb8();
        let pixel = decoded.get_pixel(16, 16).0;
        assert!(pixel.iter().all(|&c| c > 240), "expected white, got {:?}", pixel);
    }

    #[test]
    fn test_flatten_blends_partial_alpha() {
        let half = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flat = flatten_onto_white(half).to_rgb8();
        let [r, g, b] = flat.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((125..=130).contains(&r), "got {}", r);
    }

    #[test]
    fn test_grayscale_is_converted_to_rgb() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([200])));
        let flat = flatten_onto_white(gray);
        assert_eq!(flat.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_undecodable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"definitely not an image").unwrap();

        assert!(render_thumbnail(&source, 400, 85).is_err());
    }

    #[test]
    fn test_write_atomically_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c.jpg");

        write_atomically(&target, b"jpeg").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"jpeg");
        let leftovers = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1, "no temporary files remain");
    }
}
