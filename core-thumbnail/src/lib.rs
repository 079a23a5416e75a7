//! # Thumbnail Pipeline
//!
//! Produces and maintains the local cache of photo previews.
//!
//! ## Overview
//!
//! This module handles:
//! - Decoding originals with EXIF orientation applied
//! - Flattening transparency and bounding the longest side
//! - Atomic writes into a cache tree mirroring the photo tree
//! - Removing thumbnails for photos that are gone

pub mod error;
pub mod render;
pub mod thumbnail;

pub use error::{Result, ThumbnailError};
pub use render::{render_thumbnail, RenderedThumbnail};
pub use thumbnail::{GenerationSummary, ThumbnailConfig, ThumbnailHandle, ThumbnailService};
