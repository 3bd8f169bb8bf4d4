use thiserror::Error;

/// Dispatch and plugin error types
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown operation '{operation}' for {category}; valid operations: {}", valid.join(", "))]
    UnknownOperation {
        category: String,
        operation: String,
        /// Every operation the contract declares, sorted
        valid: Vec<String>,
    },

    #[error("Plugin '{plugin}' does not implement '{operation}'")]
    MissingImplementation { plugin: String, operation: String },

    #[error("Contract violation in '{operation}': expected {expected}, got {actual}")]
    ContractViolation {
        operation: String,
        expected: String,
        actual: String,
    },

    #[error("No plugin registered for {selection}")]
    UnknownPlugin { selection: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Plugin execution error: {0}")]
    ExecutionError(String),

    #[error("Metadata error: {0}")]
    Metadata(#[from] cryoflow_meta::MetadataError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DispatchError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// True for errors that point at a wiring mistake rather than bad input data.
    pub fn is_integration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation { .. }
                | Self::MissingImplementation { .. }
                | Self::ContractViolation { .. }
                | Self::UnknownPlugin { .. }
        )
    }
}

pub type PluginResult<T> = Result<T, DispatchError>;
