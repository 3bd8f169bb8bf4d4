//! Core types for the Cryoflow plugin layer.
//!
//! This module defines the plugin categories the pipeline knows about and the
//! `(category, software, hardware, version)` selection used to pick a concrete
//! plugin out of the registry.

use crate::error::SelectionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plugin category.
///
/// Each category owns exactly one capability contract. Pipeline stages talk to
/// a plugin of a given category only through the operations that contract
/// declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Acquisition software parsers (EPU, ...)
    Software,
    /// Motion correction programs
    Motion,
    /// CTF estimation programs
    Ctf,
    /// Particle picking programs
    Picking,
    /// Movie compression programs
    Compress,
    /// External copy helpers working on the acquisition tree
    CopyExtern,
}

impl Category {
    /// All categories, in pipeline order.
    pub const ALL: [Category; 6] = [
        Category::Software,
        Category::Motion,
        Category::Ctf,
        Category::Picking,
        Category::Compress,
        Category::CopyExtern,
    ];

    /// Returns the canonical lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Software => "software",
            Category::Motion => "motion",
            Category::Ctf => "ctf",
            Category::Picking => "picking",
            Category::Compress => "compress",
            Category::CopyExtern => "copy_extern",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| SelectionError::UnknownCategory {
                name: s.to_string(),
            })
    }
}

/// Selects one plugin out of the registry.
///
/// A `None` version means "the latest version registered for this
/// software/hardware pair".
///
/// # Examples
///
/// ```
/// use cryoflow_core::types::{Category, PluginSelection};
///
/// let selection = PluginSelection::new(Category::Software, "EPU", "Falcon")
///     .with_version("1.9");
/// assert!(selection.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSelection {
    /// Plugin category
    pub category: Category,

    /// Software or program name (e.g. "EPU", "MotionCor2")
    pub software: String,

    /// Hardware the plugin targets (e.g. "Falcon", "K2", "gpu")
    pub hardware: String,

    /// Requested version; latest when absent
    #[serde(default)]
    pub version: Option<String>,
}

impl PluginSelection {
    /// Creates a selection that resolves to the latest version.
    pub fn new(
        category: Category,
        software: impl Into<String>,
        hardware: impl Into<String>,
    ) -> Self {
        Self {
            category,
            software: software.into(),
            hardware: hardware.into(),
            version: None,
        }
    }

    /// Pins the requested version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Validates the selection.
    pub fn validate(&self) -> Result<(), SelectionError> {
        let invalid = |reason: &str| SelectionError::Invalid {
            category: self.category.to_string(),
            reason: reason.to_string(),
        };

        if self.software.trim().is_empty() {
            return Err(invalid("software name cannot be empty"));
        }

        if self.hardware.trim().is_empty() {
            return Err(invalid("hardware name cannot be empty"));
        }

        if matches!(&self.version, Some(v) if v.trim().is_empty()) {
            return Err(invalid("version cannot be an empty string"));
        }

        Ok(())
    }
}

impl fmt::Display for PluginSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}@{}",
            self.category,
            self.software,
            self.hardware,
            self.version.as_deref().unwrap_or("latest")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_names() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("Copy-Extern".parse::<Category>().unwrap(), Category::CopyExtern);
        assert!("gain".parse::<Category>().is_err());
    }

    #[test]
    fn test_selection_validation() {
        let selection = PluginSelection::new(Category::Motion, "MotionCor2", "gpu");
        assert!(selection.validate().is_ok());

        let empty = PluginSelection::new(Category::Motion, "", "gpu");
        assert!(empty.validate().is_err());

        let blank_version = PluginSelection::new(Category::Ctf, "CTFFIND4", "cpu").with_version(" ");
        assert!(blank_version.validate().is_err());
    }

    #[test]
    fn test_selection_display() {
        let selection = PluginSelection::new(Category::Software, "EPU", "K2");
        assert_eq!(selection.to_string(), "software:EPU/K2@latest");
        assert_eq!(
            selection.with_version("2.0").to_string(),
            "software:EPU/K2@2.0"
        );
    }

    #[test]
    fn test_selection_from_yaml() {
        let yaml = "category: copy_extern\nsoftware: EPU\nhardware: Falcon\n";
        let selection: PluginSelection = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(selection.category, Category::CopyExtern);
        assert_eq!(selection.version, None);
    }
}
