//! Photo metadata extraction.
//!
//! Dimensions come from the image header; camera, lens and exposure values
//! come from the embedded EXIF block when one exists. PNG, GIF and most WebP
//! files carry no EXIF, which yields dimensions only.

use crate::models::ExifData;
use exif::{Exif, Field, In, Reader, Tag, Value};
use serde_json::{json, Value as JsonValue};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Read the cached metadata of an original.
///
/// Blocking; run on the blocking pool. Unreadable images give an empty bag.
pub fn read_photo_metadata(path: &Path) -> ExifData {
    let mut data = ExifData::default();

    match image::image_dimensions(path) {
        Ok((width, height)) => {
            data.width = Some(width);
            data.height = Some(height);
            if height > 0 {
                data.aspect_ratio = Some(width as f64 / height as f64);
            }
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Could not read image dimensions");
            return data;
        }
    }

    if let Some(exif) = read_exif(path) {
        for (key, value) in exif_attributes(&exif) {
            data.attributes.insert(key.to_string(), value);
        }
    }

    data
}

fn read_exif(path: &Path) -> Option<Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No EXIF block");
            None
        }
    }
}

fn exif_attributes(exif: &Exif) -> Vec<(&'static str, JsonValue)> {
    let field = |tag| exif.get_field(tag, In::PRIMARY);
    let mut attributes = Vec::new();

    if let Some(model) = field(Tag::Model).and_then(field_as_string) {
        attributes.push(("camera", json!(model)));
    }
    if let Some(lens) = field(Tag::LensModel).and_then(field_as_string) {
        attributes.push(("lens", json!(lens)));
    }
    if let Some(iso) = field(Tag::PhotographicSensitivity).and_then(|f| f.value.get_uint(0)) {
        attributes.push(("iso", json!(iso)));
    }
    if let Some(aperture) = field(Tag::FNumber).and_then(field_as_rational_f64) {
        attributes.push(("aperture", json!(aperture)));
    }
    if let Some(exposure) = field(Tag::ExposureTime).and_then(field_as_string) {
        attributes.push(("shutter_speed", json!(exposure)));
    }

    let taken = field(Tag::DateTimeOriginal)
        .or_else(|| field(Tag::DateTime))
        .and_then(field_as_string);
    if let Some(taken) = taken {
        attributes.push(("date_taken", json!(taken)));
    }

    if let Some(orientation) = field(Tag::Orientation).and_then(|f| f.value.get_uint(0)) {
        attributes.push(("orientation", json!(orientation)));
    }

    attributes
}

fn field_as_string(field: &Field) -> Option<String> {
    let text = match &field.value {
        Value::Ascii(values) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).trim().to_string())?,
        _ => field.display_value().to_string().trim().to_string(),
    };
    (!text.is_empty()).then_some(text)
}

fn field_as_rational_f64(field: &Field) -> Option<f64> {
    match &field.value {
        Value::Rational(values) => values.first().map(|r| r.to_f64()),
        _ => None,
    }
}
