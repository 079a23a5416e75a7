//! # Object Store Provider
//!
//! Implements the `ObjectStore` bridge trait on top of OpenDAL.
//!
//! ## Overview
//!
//! This module provides:
//! - S3-compatible buckets (Cloudflare R2, AWS S3, MinIO) from catalog credentials
//! - A local directory acting as a bucket, for staging and tests
//! - An in-memory store
//!
//! Keys are used verbatim as object paths; content type and cache headers
//! are attached when the backend can store them.

pub mod error;
pub mod store;

pub use error::{ObjectStoreError, Result};
pub use store::OpendalObjectStore;
