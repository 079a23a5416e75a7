//! # Host Bridge Traits
//!
//! Capability traits the catalog core requires but does not implement itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the reconciliation core and the
//! concrete remote backends. The core only ever talks to a trait object, so the
//! engine can be driven against S3-compatible storage in production, a local
//! directory during development, or an in-memory fake in tests.
//!
//! ## Traits
//!
//! - [`ObjectStore`](object_store::ObjectStore) - Keyed blob storage with list,
//!   upload, delete and download
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Implementations should:
//!
//! - Convert backend-specific errors to `BridgeError`
//! - Report a missing object as [`BridgeError::NotFound`] so callers can tell
//!   "absent" apart from "unreachable"
//! - Include the object key in error messages
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so a single client can be
//! shared across async tasks behind an `Arc`.
//!
//! ## Examples
//!
//! ```ignore
//! use bridge_traits::object_store::{DeleteOutcome, ObjectStore};
//!
//! async fn unpublish(store: &dyn ObjectStore, key: &str) -> bridge_traits::error::Result<()> {
//!     match store.delete(key).await? {
//!         DeleteOutcome::Deleted => tracing::info!(key, "Removed object"),
//!         DeleteOutcome::NotFound => tracing::debug!(key, "Object already gone"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod object_store;

pub use error::BridgeError;
pub use object_store::{DeleteOutcome, ObjectStore, UploadOptions};
