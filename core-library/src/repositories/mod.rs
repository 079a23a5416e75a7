//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Partial updates go through explicit update structs, never ad-hoc SQL
//!
//! ## Available Repositories
//!
//! - `PhotoRepository` - Photo records keyed by relative path
//! - `AlbumRepository` - Album records keyed by folder name

pub mod album;
pub mod photo;

pub use album::{AlbumRepository, SqliteAlbumRepository};
pub use photo::{IndexSummary, PhotoRepository, SqlitePhotoRepository};
