//! # Cryoflow
//!
//! Command-line front end over the Cryoflow plugin layer: logging setup,
//! registry construction from configuration and session scanning.

pub mod logging;
pub mod scan;

use anyhow::{Context, Result};
use cryoflow_core::AppConfig;
use cryoflow_meta::LevelSpec;
use cryoflow_plugin_api::{PluginRegistry, ShapeCheck};

pub use scan::{ExposureReport, ScanReport, SessionScanner};

/// Builds the plugin registry described by `config`.
pub fn registry_from_config(config: &AppConfig) -> Result<PluginRegistry> {
    let spec = match &config.metadata.level_spec {
        Some(path) => LevelSpec::from_file(path)
            .with_context(|| format!("Failed to load level specification {:?}", path))?,
        None => LevelSpec::epu(),
    };
    let shape_check = ShapeCheck::from_enabled(config.dispatch.shape_checks_enabled());

    Ok(cryoflow_plugins::build_registry(shape_check, spec))
}
