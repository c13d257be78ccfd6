//! Error types for document handling, persistence, and metadata parsing.

use std::time::Duration;
use thiserror::Error;

/// Errors from parsing, validating, or serializing an annotation document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The header or its schema version is missing
    #[error("Missing schema version in document header")]
    SchemaMissing,

    /// The schema's major version is not one this build understands
    #[error("Unsupported schema version '{found}', supported major version is {supported}")]
    SchemaUnsupported {
        /// Version string found in the document
        found: String,
        /// Major version this build accepts
        supported: u32,
    },

    /// Geometry coordinates violate the shape invariants
    #[error("Invalid geometry: {message}")]
    InvalidGeometry {
        /// Description of the violated invariant
        message: String,
    },

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocumentError {
    /// Create an invalid geometry error with a message.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }
}

/// Errors from the remote store.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status
    #[error("Server responded with status {0}")]
    Status(u16),

    /// The request never completed
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its deadline
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from the local fallback store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No fallback storage exists in this environment
    #[error("Local storage is unavailable")]
    Unavailable,

    /// The write was attempted and refused
    #[error("Local storage write failed: {0}")]
    WriteFailed(String),
}

/// Errors escalated by a save.
///
/// Transport failures are absorbed by the fallback tier and never appear
/// here; a save only fails when the payload cannot be encoded or when the
/// fallback tier itself refuses the write.
#[derive(Error, Debug)]
pub enum SaveError {
    /// The session snapshot could not be serialized
    #[error("Failed to encode save payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The fallback tier refused the write
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the image-metadata sidecar.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// A required property key is absent
    #[error("Metadata property not found: {key}")]
    NotFound {
        /// The missing property key
        key: String,
    },

    /// A property is present but its value does not parse as a number
    #[error("Metadata property '{key}' has non-numeric value '{value}'")]
    Malformed {
        /// The property key
        key: String,
        /// The unparseable value
        value: String,
    },

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl MetadataError {
    /// Create a not-found error for a property key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a malformed-value error.
    pub fn malformed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_messages() {
        let err = DocumentError::SchemaUnsupported {
            found: "1.0".to_string(),
            supported: 2,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported schema version '1.0', supported major version is 2"
        );

        let err = DocumentError::invalid_geometry("ring too short");
        assert!(matches!(err, DocumentError::InvalidGeometry { .. }));
        assert_eq!(err.to_string(), "Invalid geometry: ring too short");
    }

    #[test]
    fn test_storage_error_converts_into_save_error() {
        let err: SaveError = StorageError::WriteFailed("quota exceeded".to_string()).into();
        assert!(matches!(err, SaveError::Storage(_)));
        // Transparent: the storage message passes through unchanged.
        assert_eq!(err.to_string(), "Local storage write failed: quota exceeded");
    }

    #[test]
    fn test_metadata_error_constructors() {
        let err = MetadataError::not_found("openslide.mpp-x");
        assert_eq!(
            err.to_string(),
            "Metadata property not found: openslide.mpp-x"
        );

        let err = MetadataError::malformed("openslide.mpp-y", "abc");
        assert!(matches!(err, MetadataError::Malformed { .. }));
    }

    #[test]
    fn test_timeout_message_names_the_deadline() {
        let err = TransportError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Remote call timed out after 10s");
    }
}
