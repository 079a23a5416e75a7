use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Object store is not configured; set R2_ACCESS_KEY_ID and related variables")]
    NotConfigured,

    #[error("Reconciliation already in progress")]
    SyncInProgress,

    #[error("Object store error: {0}")]
    Store(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Snapshot export failed: {0}")]
    Snapshot(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reconciliation timed out after {0} seconds")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, SyncError>;
