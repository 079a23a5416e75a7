//! # Sync & Publishing Module
//!
//! Publishes the local photo catalog to the object store.
//!
//! ## Overview
//!
//! This module manages:
//! - One-way reconciliation of published photos and their thumbnails
//! - Export of the published rows as a portable SQLite snapshot
//! - Bootstrapping a fresh deployment from that snapshot
//!
//! ## Components
//!
//! - **Reconciliation Engine** (`reconcile`): computes and applies upload/delete sets
//! - **Sync Report** (`report`): structured, serializable pass outcome
//! - **Snapshot** (`snapshot`): exporter and bootstrapper for `metadata/published.db`

pub mod error;
pub mod reconcile;
pub mod report;
pub mod snapshot;

pub use error::{Result, SyncError};
pub use reconcile::ReconciliationEngine;
pub use report::SyncReport;
pub use snapshot::{BootstrapOutcome, SnapshotBootstrapper, SnapshotExporter, SnapshotFile};
