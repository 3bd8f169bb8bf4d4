//! Error types for metadata extraction

use thiserror::Error;

/// Result type for metadata extraction
pub type Result<T> = std::result::Result<T, MetadataError>;

/// Errors that can occur while extracting acquisition metadata.
///
/// Only unreadable documents, duplicate key/value entries and failed lookups
/// of derived inputs are errors. Shapes the extractor does not recognise
/// contribute nothing.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Malformed XML document: {0}")]
    Malformed(String),

    #[error("Duplicate metadata key: {key}")]
    DuplicateMetadataKey { key: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid number for field '{field}': {value}")]
    InvalidNumber { field: String, value: String },

    #[error("Invalid level specification: {0}")]
    InvalidLevelSpec(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MetadataError {
    /// Returns true if the error means the document itself is unusable.
    pub fn is_corrupt_document(&self) -> bool {
        matches!(
            self,
            MetadataError::XmlError(_)
                | MetadataError::Malformed(_)
                | MetadataError::DuplicateMetadataKey { .. }
        )
    }
}
