//! Level specifications driving the recursive walk
//!
//! A `LevelSpec` is immutable configuration: which qualified tags trigger which
//! extraction strategy and which child/leaf suffixes each of them accepts.

use crate::error::{MetadataError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// FEI/Thermo shared-object schema namespace
pub const NS_SHARED_OBJECTS: &str = "http://schemas.datacontract.org/2004/07/Fei.SharedObjects";
/// Serialized array namespace holding the Key/Value entries
pub const NS_ARRAYS: &str = "http://schemas.microsoft.com/2003/10/Serialization/Arrays";

/// Builds a `{uri}local` qualified tag.
pub fn qualify(namespace: &str, local: &str) -> String {
    format!("{{{}}}{}", namespace, local)
}

/// Tag-to-strategy table consumed by the extractor.
///
/// # Examples
///
/// ```
/// use cryoflow_meta::spec::{qualify, LevelSpec, NS_SHARED_OBJECTS};
///
/// let spec = LevelSpec::epu();
/// assert!(spec.is_level0(&qualify(NS_SHARED_OBJECTS, "acquisitionDateTime")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Tags of generic Key/Value array entries
    #[serde(default)]
    pub key_value: BTreeSet<String>,

    /// Local name of the key child inside a Key/Value entry
    #[serde(default = "default_key_name")]
    pub key_name: String,

    /// Local name of the value child inside a Key/Value entry
    #[serde(default = "default_value_name")]
    pub value_name: String,

    /// Tags whose own text is recorded
    #[serde(default)]
    pub level0: BTreeSet<String>,

    /// Tags whose matching children are recorded as `{tag}_{child}`
    #[serde(default)]
    pub level1: BTreeMap<String, Vec<String>>,

    /// Tags whose matching great-grandchildren are recorded as `{level1}_{level2}`
    #[serde(default)]
    pub level3: BTreeMap<String, Vec<String>>,
}

fn default_key_name() -> String {
    "Key".to_string()
}

fn default_value_name() -> String {
    "Value".to_string()
}

impl Default for LevelSpec {
    fn default() -> Self {
        Self {
            key_value: BTreeSet::new(),
            key_name: default_key_name(),
            value_name: default_value_name(),
            level0: BTreeSet::new(),
            level1: BTreeMap::new(),
            level3: BTreeMap::new(),
        }
    }
}

impl LevelSpec {
    /// Specification for EPU micrograph/movie XML files.
    pub fn epu() -> Self {
        let shared = |local: &str| qualify(NS_SHARED_OBJECTS, local);
        let suffixes = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let level0 = [
            "acquisitionDateTime",
            "AccelerationVoltage",
            "ApplicationSoftware",
            "ApplicationSoftwareVersion",
            "ComputerName",
            "Defocus",
            "ExposureTime",
            "InstrumentID",
            "InstrumentModel",
            "Intensity",
            "NominalMagnification",
            "SpotIndex",
        ]
        .iter()
        .map(|tag| shared(tag))
        .collect();

        let mut level1 = BTreeMap::new();
        level1.insert(shared("Binning"), suffixes(&["x", "y"]));
        level1.insert(shared("ReadoutArea"), suffixes(&["height", "width"]));
        level1.insert(shared("BeamShift"), suffixes(&["_x", "_y"]));
        level1.insert(shared("BeamTilt"), suffixes(&["_x", "_y"]));
        level1.insert(shared("ImageShift"), suffixes(&["_x", "_y"]));
        level1.insert(shared("Position"), suffixes(&["A", "B", "X", "Y", "Z"]));

        let mut level3 = BTreeMap::new();
        level3.insert(shared("SpatialScale"), suffixes(&["numericValue"]));

        let mut key_value = BTreeSet::new();
        key_value.insert(qualify(NS_ARRAYS, "KeyValueOfstringanyType"));

        Self {
            key_value,
            level0,
            level1,
            level3,
            ..Self::default()
        }
    }

    /// Loads a specification from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Loads a specification from a YAML string and validates it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let spec: LevelSpec = serde_yaml::from_str(yaml)
            .map_err(|e| MetadataError::InvalidLevelSpec(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Rejects empty tags and empty suffix lists.
    pub fn validate(&self) -> Result<()> {
        let all_tags = self
            .key_value
            .iter()
            .chain(self.level0.iter())
            .chain(self.level1.keys())
            .chain(self.level3.keys());
        for tag in all_tags {
            if tag.trim().is_empty() {
                return Err(MetadataError::InvalidLevelSpec(
                    "tags cannot be empty".to_string(),
                ));
            }
        }

        for (tag, suffixes) in self.level1.iter().chain(self.level3.iter()) {
            if suffixes.is_empty() || suffixes.iter().any(|s| s.is_empty()) {
                return Err(MetadataError::InvalidLevelSpec(format!(
                    "'{}' needs at least one non-empty suffix",
                    tag
                )));
            }
        }

        if self.key_name.is_empty() || self.value_name.is_empty() {
            return Err(MetadataError::InvalidLevelSpec(
                "key/value child names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_key_value(&self, tag: &str) -> bool {
        self.key_value.contains(tag)
    }

    pub fn is_level0(&self, tag: &str) -> bool {
        self.level0.contains(tag)
    }

    pub fn level1_suffixes(&self, tag: &str) -> Option<&[String]> {
        self.level1.get(tag).map(Vec::as_slice)
    }

    pub fn level3_suffixes(&self, tag: &str) -> Option<&[String]> {
        self.level3.get(tag).map(Vec::as_slice)
    }
}

/// True when `tag` ends with one of the accepted suffixes.
pub(crate) fn matches_suffix(tag: &str, suffixes: &[String]) -> bool {
    suffixes.iter().any(|suffix| tag.ends_with(suffix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epu_spec_is_valid() {
        let spec = LevelSpec::epu();
        assert!(spec.validate().is_ok());
        assert!(spec.is_key_value(&qualify(NS_ARRAYS, "KeyValueOfstringanyType")));
        assert_eq!(
            spec.level3_suffixes(&qualify(NS_SHARED_OBJECTS, "SpatialScale")),
            Some(&["numericValue".to_string()][..])
        );
        assert!(spec.level1_suffixes("Binning").is_none());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
level0:
  - "{urn:x}Voltage"
level1:
  "{urn:x}Binning": [x, y]
"#;
        let spec = LevelSpec::from_yaml(yaml).unwrap();
        assert!(spec.is_level0("{urn:x}Voltage"));
        assert_eq!(spec.key_name, "Key");
        assert!(spec.key_value.is_empty());
    }

    #[test]
    fn test_from_yaml_rejects_empty_suffixes() {
        let yaml = "level1:\n  \"{urn:x}Binning\": []\n";
        assert!(matches!(
            LevelSpec::from_yaml(yaml),
            Err(MetadataError::InvalidLevelSpec(_))
        ));
    }

    #[test]
    fn test_matches_suffix() {
        let suffixes = vec!["_x".to_string(), "height".to_string()];
        assert!(matches_suffix("{urn:d}_x", &suffixes));
        assert!(matches_suffix("{urn:d}height", &suffixes));
        assert!(!matches_suffix("{urn:d}_y", &suffixes));
    }
}
