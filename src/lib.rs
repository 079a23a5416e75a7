//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-thumbnail`). Deployments can depend
//! on `photo-catalog` and enable the documented features without wiring each
//! crate individually.

#[cfg(feature = "service")]
pub use core_service::*;

#[cfg(feature = "thumbnails")]
pub use core_thumbnail as thumbnail;
