//! Outcome of a reconciliation pass

use serde::Serialize;
use std::time::Instant;
use tracing::{error, warn};

/// Structured result of one reconciliation pass.
///
/// Warnings describe items skipped or left for a later pass; errors describe
/// failed operations. Only errors make a pass unsuccessful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Originals uploaded
    pub uploaded: usize,
    /// Originals deleted
    pub deleted: usize,
    /// Thumbnails rendered into the local cache
    pub thumbnails_generated: usize,
    /// Missing remote thumbnails uploaded for already-published originals
    pub thumbnails_repaired: usize,
    /// Remote thumbnails removed because their original is no longer published
    pub orphaned_thumbnails_deleted: usize,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub uploaded_files: Vec<String>,
    pub deleted_files: Vec<String>,
    pub snapshot_exported: bool,
    pub success: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    /// Report for a pass that stopped before doing any work.
    pub fn failed(message: impl Into<String>) -> Self {
        let mut report = SyncReport::default();
        report.errors.push(message.into());
        report
    }

    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub(crate) fn error(&mut self, message: String) {
        error!("{}", message);
        self.errors.push(message);
    }

    pub(crate) fn finish(mut self, started: Instant) -> Self {
        self.success = self.errors.is_empty();
        self.duration_ms = started.elapsed().as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail_a_pass() {
        let mut report = SyncReport::default();
        report.warn("Published photo missing on disk: a.jpg".to_string());
        let report = report.finish(Instant::now());

        assert!(report.success);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_errors_fail_a_pass() {
        let mut report = SyncReport::default();
        report.error("Failed to upload a.jpg: denied".to_string());
        assert!(!report.finish(Instant::now()).success);
        assert!(!SyncReport::failed("boom").success);
    }
}
