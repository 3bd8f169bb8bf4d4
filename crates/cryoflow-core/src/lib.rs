//! # Cryoflow Core
//!
//! Core types, error handling, and configuration for the Cryoflow cryo-EM
//! preprocessing plugin layer.
//!
//! - **Types**: plugin `Category` and the `PluginSelection` triple used to pick a
//!   concrete plugin out of the registry.
//! - **Errors**: serializable error types built with `thiserror`.
//! - **Configuration**: YAML files with environment variable overrides and
//!   validation.
//!
//! ## Example
//!
//! ```
//! use cryoflow_core::config::AppConfig;
//! use cryoflow_core::types::{Category, PluginSelection};
//!
//! let mut config = AppConfig::default();
//! config
//!     .plugins
//!     .push(PluginSelection::new(Category::Software, "EPU", "Falcon"));
//!
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{CryoflowError, Result};
pub use types::{Category, PluginSelection};
