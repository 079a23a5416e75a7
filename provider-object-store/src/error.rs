//! Error types for the object store provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Object store provider errors
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// Backend could not be constructed from the given settings
    #[error("Invalid object store configuration: {0}")]
    InvalidConfig(String),

    /// No object under the requested key
    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Request rejected or failed by the backend
    #[error("Object store backend error: {0}")]
    Backend(#[from] opendal::Error),

    /// Local file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for object store provider operations
pub type Result<T> = std::result::Result<T, ObjectStoreError>;

impl From<ObjectStoreError> for BridgeError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::NotFound { key } => BridgeError::NotFound(key),
            ObjectStoreError::Io(e) => BridgeError::Io(e),
            ObjectStoreError::Backend(e) if e.kind() == opendal::ErrorKind::NotFound => {
                BridgeError::NotFound(e.to_string())
            }
            ObjectStoreError::Backend(e) if e.kind() == opendal::ErrorKind::Unsupported => {
                BridgeError::NotAvailable(e.to_string())
            }
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ObjectStoreError::NotFound {
            key: "metadata/published.db".to_string(),
        };
        assert_eq!(error.to_string(), "Object not found: metadata/published.db");
    }

    #[test]
    fn test_not_found_converts_to_bridge_not_found() {
        let bridge: BridgeError = ObjectStoreError::NotFound {
            key: "a.jpg".to_string(),
        }
        .into();
        assert!(bridge.is_not_found());

        let backend = opendal::Error::new(opendal::ErrorKind::NotFound, "missing");
        let bridge: BridgeError = ObjectStoreError::Backend(backend).into();
        assert!(bridge.is_not_found());
    }

    #[test]
    fn test_backend_failure_converts_to_operation_failed() {
        let backend = opendal::Error::new(opendal::ErrorKind::PermissionDenied, "denied");
        let bridge: BridgeError = ObjectStoreError::Backend(backend).into();
        assert!(matches!(bridge, BridgeError::OperationFailed(_)));
    }
}
