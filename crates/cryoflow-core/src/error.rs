//! Error types shared across the Cryoflow workspace.
//!
//! Library crates define their own focused error enums (metadata extraction,
//! plugin dispatch); this module holds the errors of the shared layers
//! (configuration and I/O) and the top-level aggregate used by callers that
//! surface failures to an operator. All errors here are serializable so they
//! can be written into job reports.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias using CryoflowError as the error type.
pub type Result<T> = std::result::Result<T, CryoflowError>;

/// Top-level error type for the shared Cryoflow layers.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum CryoflowError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plugin selection errors
    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

/// Errors related to configuration.
///
/// These errors occur when loading, parsing, or validating configuration files.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Two selections target the same category
    #[error("Duplicate plugin selection for category: {category}")]
    DuplicateSelection { category: String },
}

impl ConfigError {
    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while interpreting a plugin selection triple.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum SelectionError {
    /// Category name is not one of the known plugin categories
    #[error("Unknown plugin category: {name}")]
    UnknownCategory { name: String },

    /// Selection is structurally invalid
    #[error("Invalid plugin selection for {category}: {reason}")]
    Invalid { category: String, reason: String },
}

/// Wrapper for I/O errors to make them serializable.
#[derive(Debug, Error, Serialize, Deserialize)]
#[error("I/O error: {kind:?}: {message}")]
pub struct IoError {
    pub kind: IoErrorKind,
    pub message: String,
}

impl From<io::Error> for IoError {
    fn from(err: io::Error) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for CryoflowError {
    fn from(err: io::Error) -> Self {
        CryoflowError::Io(err.into())
    }
}

/// Serializable version of std::io::ErrorKind.
///
/// Only the kinds that filesystem-bound plugins run into are kept distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    AlreadyExists,
    InvalidInput,
    InvalidData,
    TimedOut,
    Interrupted,
    UnexpectedEof,
    Other,
}

impl From<io::ErrorKind> for IoErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => IoErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => IoErrorKind::AlreadyExists,
            io::ErrorKind::InvalidInput => IoErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => IoErrorKind::InvalidData,
            io::ErrorKind::TimedOut => IoErrorKind::TimedOut,
            io::ErrorKind::Interrupted => IoErrorKind::Interrupted,
            io::ErrorKind::UnexpectedEof => IoErrorKind::UnexpectedEof,
            _ => IoErrorKind::Other,
        }
    }
}
