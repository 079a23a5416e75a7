//! # Library Management Module
//!
//! Owns the catalog metadata database and the local tree of originals.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repository patterns for photos and albums
//! - Resolution and listing of original files under the photos root
//! - Dimension and EXIF extraction for newly indexed photos
//! - The remote key layout and content types shared by every publisher

pub mod db;
pub mod error;
pub mod library;
pub mod media;
pub mod metadata;
pub mod models;
pub mod repositories;

pub use error::{LibraryError, Result};
pub use library::LocalLibrary;
pub use models::{AlbumRecord, AlbumUpdate, ExifData, PhotoRecord, PhotoRow, PhotoUpdate};
pub use repositories::{
    AlbumRepository, IndexSummary, PhotoRepository, SqliteAlbumRepository, SqlitePhotoRepository,
};
