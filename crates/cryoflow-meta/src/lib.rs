//! Acquisition metadata extraction for cryo-EM movies
//!
//! This crate recovers a flat key/value record of acquisition parameters from
//! the vendor XML file written next to every movie, and from the structured
//! movie filename itself.
//!
//! # Features
//!
//! - Namespace-aware XML tree built with quick-xml
//! - Configurable level specifications (built-in EPU layout or YAML)
//! - Key/Value array extraction with duplicate detection
//! - Dose-fraction and derived dose fields
//! - EPU filename token parsing
//!
//! # Example
//!
//! ```rust
//! use cryoflow_meta::{parse_filename, MetadataExtractor};
//!
//! let xml = r#"<MicroscopeImage xmlns="http://schemas.datacontract.org/2004/07/Fei.SharedObjects">
//!     <microscopeData><gun><AccelerationVoltage>300000</AccelerationVoltage></gun></microscopeData>
//! </MicroscopeImage>"#;
//!
//! let mut record = MetadataExtractor::epu().extract(xml.as_bytes()).unwrap();
//! record.merge(parse_filename("FoilHole_1_Data_2_3_20200101_1200.xml"));
//!
//! assert_eq!(record.get("AccelerationVoltage"), Some("300000"));
//! assert_eq!(record.get("SpotNumber"), Some("23"));
//! ```

pub mod error;
pub mod extract;
pub mod filename;
pub mod record;
pub mod spec;
pub mod tree;

pub use error::{MetadataError, Result};
pub use extract::{derive_dose_on_camera, MetadataExtractor};
pub use filename::{parse_filename, FilenameTokens};
pub use record::MetadataRecord;
pub use spec::LevelSpec;
pub use tree::{parse_document, parse_document_str, XmlNode};
