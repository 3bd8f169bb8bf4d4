//! Recursive metadata walk over a vendor XML document
//!
//! Every element is offered to all four strategies (key/value array, level 0,
//! level 1, level 3); the strategies are independent and may all fire on the
//! same element. Unrecognised shapes contribute nothing so that fields added by
//! newer acquisition software versions never break extraction.

use crate::error::{MetadataError, Result};
use crate::record::MetadataRecord;
use crate::spec::{matches_suffix, LevelSpec};
use crate::tree::{parse_document, XmlNode};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, trace};

/// Field derived from a dose-fraction sub-tree
pub const FRAMES_PER_FRACTION: &str = "FramesPerFraction";
/// Field derived from a dose-fraction sub-tree
pub const NUMBER_OF_FRACTIONS: &str = "NumberOffractions";
/// Dose seen by one camera pixel
pub const DOSE_ON_CAMERA: &str = "DoseOnCamera";

/// Turns one XML document into a flat `MetadataRecord`.
///
/// The extractor holds only its immutable `LevelSpec`; every call allocates a
/// fresh record, so one extractor can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    spec: LevelSpec,
}

/// Per-document walk state.
struct Walk<'s> {
    spec: &'s LevelSpec,
    record: MetadataRecord,
    key_value_keys: BTreeSet<String>,
}

impl MetadataExtractor {
    pub fn new(spec: LevelSpec) -> Self {
        Self { spec }
    }

    /// Extractor configured for EPU documents.
    pub fn epu() -> Self {
        Self::new(LevelSpec::epu())
    }

    pub fn spec(&self) -> &LevelSpec {
        &self.spec
    }

    /// Parses and walks a document held in memory.
    ///
    /// # Errors
    ///
    /// Malformed XML and duplicate key/value entries.
    pub fn extract(&self, xml: &[u8]) -> Result<MetadataRecord> {
        let root = parse_document(xml)?;
        self.extract_tree(&root)
    }

    /// Reads, parses and walks a document from disk.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<MetadataRecord> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let record = self.extract(&bytes)?;
        debug!(path = %path.display(), fields = record.len(), "extracted acquisition metadata");
        Ok(record)
    }

    /// Walks an already parsed document.
    pub fn extract_tree(&self, root: &XmlNode) -> Result<MetadataRecord> {
        let mut walk = Walk {
            spec: &self.spec,
            record: MetadataRecord::new(),
            key_value_keys: BTreeSet::new(),
        };
        walk.visit(root)?;
        Ok(walk.record)
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::epu()
    }
}

impl Walk<'_> {
    fn visit(&mut self, node: &XmlNode) -> Result<()> {
        if self.spec.is_key_value(&node.tag) {
            self.key_value_entry(node)?;
        }

        if self.spec.is_level0(&node.tag) {
            self.level0(node);
        }

        if let Some(suffixes) = self.spec.level1_suffixes(&node.tag) {
            self.level1(node, suffixes);
        }

        if let Some(suffixes) = self.spec.level3_suffixes(&node.tag) {
            self.level3(node, suffixes);
        }

        for child in &node.children {
            self.visit(child)?;
        }

        Ok(())
    }

    fn key_value_entry(&mut self, node: &XmlNode) -> Result<()> {
        let keys = node
            .children
            .iter()
            .filter(|c| c.local_name() == self.spec.key_name);
        let values = node
            .children
            .iter()
            .filter(|c| c.local_name() == self.spec.value_name);

        for (key_node, value_node) in keys.zip(values) {
            let key = normalize_component(key_node.text().unwrap_or_default());
            if key.is_empty() {
                continue;
            }
            self.claim_key_value(&key)?;

            match value_node.text() {
                Some(text) => {
                    self.record.insert(key, text);
                }
                None => {
                    for (field, value) in nested_value_fields(value_node) {
                        self.claim_key_value(field)?;
                        self.record.insert(field, value);
                    }
                }
            }
        }

        Ok(())
    }

    fn claim_key_value(&mut self, key: &str) -> Result<()> {
        if !self.key_value_keys.insert(key.to_string()) {
            return Err(MetadataError::DuplicateMetadataKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn level0(&mut self, node: &XmlNode) {
        if let Some(text) = node.text() {
            self.insert(normalize_component(&node.tag), text);
        }
    }

    fn level1(&mut self, node: &XmlNode, suffixes: &[String]) {
        let parent = normalize_component(&node.tag);
        for child in &node.children {
            if !matches_suffix(&child.tag, suffixes) {
                continue;
            }
            if let Some(text) = child.text() {
                self.insert(
                    format!("{}_{}", parent, normalize_component(&child.tag)),
                    text,
                );
            }
        }
    }

    fn level3(&mut self, node: &XmlNode, suffixes: &[String]) {
        for first in &node.children {
            for second in &first.children {
                for leaf in &second.children {
                    if !matches_suffix(&leaf.tag, suffixes) {
                        continue;
                    }
                    if let Some(text) = leaf.text() {
                        self.insert(
                            format!(
                                "{}_{}",
                                normalize_component(&first.tag),
                                normalize_component(&second.tag)
                            ),
                            text,
                        );
                    }
                }
            }
        }
    }

    fn insert(&mut self, key: String, value: &str) {
        trace!(key = %key, value, "metadata field");
        if let Some(previous) = self.record.insert(key.clone(), value) {
            debug!(key = %key, previous = %previous, "metadata field overwritten");
        }
    }
}

/// Fields contributed by a Key/Value entry whose value is structured.
///
/// Two shapes are known: a list of dose fractions carrying start/end frame
/// numbers, and a flat fraction count. Anything else yields no fields.
fn nested_value_fields(value: &XmlNode) -> Vec<(&'static str, String)> {
    for child in &value.children {
        let fractions: Vec<&XmlNode> = child
            .children
            .iter()
            .filter(|c| c.child("StartFrameNumber").is_some() && c.child("EndFrameNumber").is_some())
            .collect();

        if let Some(first) = fractions.first() {
            let frame = |name: &str| {
                first
                    .child(name)
                    .and_then(XmlNode::text)
                    .and_then(|t| t.parse::<i64>().ok())
            };
            let per_fraction = frame("StartFrameNumber")
                .zip(frame("EndFrameNumber"))
                .and_then(|(start, end)| end.checked_sub(start)?.checked_add(1));
            return match per_fraction {
                Some(count) => vec![
                    (FRAMES_PER_FRACTION, count.to_string()),
                    (NUMBER_OF_FRACTIONS, fractions.len().to_string()),
                ],
                None => Vec::new(),
            };
        }

        if child.local_name() == NUMBER_OF_FRACTIONS {
            if let Some(count) = child.text() {
                return vec![
                    (FRAMES_PER_FRACTION, "1".to_string()),
                    (NUMBER_OF_FRACTIONS, count.to_string()),
                ];
            }
        }
    }

    Vec::new()
}

/// Normalizes a tag or key into a record key component.
///
/// Strips the `{uri}` prefix, then surrounding whitespace and underscores.
pub fn normalize_component(tag: &str) -> String {
    crate::tree::local_name(tag)
        .trim()
        .trim_matches('_')
        .trim()
        .to_string()
}

/// Fills `DoseOnCamera` as `Dose × pixelSize_x²` when the document lacks it.
///
/// # Errors
///
/// `MissingField` / `InvalidNumber` when `Dose` or `pixelSize_x` cannot be read.
pub fn derive_dose_on_camera(record: &mut MetadataRecord) -> Result<()> {
    if record.contains_key(DOSE_ON_CAMERA) {
        return Ok(());
    }

    let dose = record.require_f64("Dose")?;
    let pixel_size = record.require_f64("pixelSize_x")?;
    record.insert(DOSE_ON_CAMERA, (dose * pixel_size * pixel_size).to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{qualify, NS_ARRAYS};

    fn kv_spec() -> LevelSpec {
        let mut spec = LevelSpec::default();
        spec.key_value.insert(qualify(NS_ARRAYS, "KeyValueOfstringanyType"));
        spec.level0.insert("Voltage".to_string());
        spec.level1
            .insert("Binning".to_string(), vec!["x".to_string(), "y".to_string()]);
        spec
    }

    fn kv_document(entries: &str) -> String {
        format!(
            r#"<Image xmlns:a="{}"><CustomData>{}</CustomData></Image>"#,
            NS_ARRAYS, entries
        )
    }

    #[test]
    fn test_normalize_component() {
        assert_eq!(normalize_component("{urn:x}_x"), "x");
        assert_eq!(normalize_component("  Dose_ "), "Dose");
        assert_eq!(normalize_component("pixelSize"), "pixelSize");
    }

    #[test]
    fn test_key_value_text() {
        let xml = kv_document(
            "<a:KeyValueOfstringanyType><a:Key>Dose</a:Key><a:Value>4.5</a:Value></a:KeyValueOfstringanyType>",
        );
        let record = MetadataExtractor::new(kv_spec()).extract(xml.as_bytes()).unwrap();
        assert_eq!(record.get("Dose"), Some("4.5"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_duplicate_key_value_is_fatal() {
        let entry = "<a:KeyValueOfstringanyType><a:Key>Dose</a:Key><a:Value>1</a:Value></a:KeyValueOfstringanyType>";
        let xml = kv_document(&format!("{entry}{entry}"));
        let err = MetadataExtractor::new(kv_spec())
            .extract(xml.as_bytes())
            .unwrap_err();
        assert!(matches!(err, MetadataError::DuplicateMetadataKey { ref key } if key == "Dose"));
        assert!(err.is_corrupt_document());
    }

    #[test]
    fn test_unknown_nested_value_contributes_nothing() {
        let xml = kv_document(
            "<a:KeyValueOfstringanyType><a:Key>Opaque</a:Key><a:Value><Other><Thing>1</Thing></Other></a:Value></a:KeyValueOfstringanyType>",
        );
        let record = MetadataExtractor::new(kv_spec()).extract(xml.as_bytes()).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_overflowing_frame_range_contributes_nothing() {
        let xml = kv_document(
            "<a:KeyValueOfstringanyType><a:Key>FractionationSettings</a:Key><a:Value><Fractions><Fraction><StartFrameNumber>-1</StartFrameNumber><EndFrameNumber>9223372036854775807</EndFrameNumber></Fraction></Fractions></a:Value></a:KeyValueOfstringanyType>",
        );
        let record = MetadataExtractor::new(kv_spec()).extract(xml.as_bytes()).unwrap();
        assert!(!record.contains_key(FRAMES_PER_FRACTION));
        assert!(!record.contains_key(NUMBER_OF_FRACTIONS));
    }

    #[test]
    fn test_level_strategies_on_plain_tags() {
        let xml = "<Image><Voltage> 300000 </Voltage><Binning><x>1</x><y>2</y><z>3</z></Binning></Image>";
        let record = MetadataExtractor::new(kv_spec()).extract(xml.as_bytes()).unwrap();
        assert_eq!(record.get("Voltage"), Some("300000"));
        assert_eq!(record.get("Binning_x"), Some("1"));
        assert_eq!(record.get("Binning_y"), Some("2"));
        assert!(!record.contains_key("Binning_z"));
    }

    #[test]
    fn test_derive_dose_on_camera() {
        let mut record = MetadataRecord::new();
        record.insert("Dose", "2.0E+20");
        record.insert("pixelSize_x", "1.0E-10");
        derive_dose_on_camera(&mut record).unwrap();

        let value = record.require_f64(DOSE_ON_CAMERA).unwrap();
        assert!((value - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_dose_on_camera_keeps_existing() {
        let mut record = MetadataRecord::new();
        record.insert(DOSE_ON_CAMERA, "7");
        derive_dose_on_camera(&mut record).unwrap();
        assert_eq!(record.get(DOSE_ON_CAMERA), Some("7"));
    }

    #[test]
    fn test_derive_dose_on_camera_missing_input() {
        let mut record = MetadataRecord::new();
        record.insert("Dose", "1");
        assert!(matches!(
            derive_dose_on_camera(&mut record),
            Err(MetadataError::MissingField(ref f)) if f == "pixelSize_x"
        ));
    }
}
