//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the photo catalog:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities every other crate depends on. It
//! establishes the configuration model (paths, bucket credentials, thumbnail
//! settings) and the logging conventions used throughout the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CatalogConfig, ObjectStoreCredentials, ThumbnailSettings};
pub use error::{Error, Result};
