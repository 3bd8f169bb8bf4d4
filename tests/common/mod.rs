//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use cryoflow_plugins::mrc::MrcHeader;
use std::path::{Path, PathBuf};

pub const STEMS: [&str; 2] = [
    "FoilHole_28385656_Data_28397105_28397106_20180530_0221",
    "FoilHole_28385660_Data_28397105_28397107_20180530_0224",
];

/// Get the path to test fixtures
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

/// Load the EPU exposure document fixture
pub fn exposure_xml() -> String {
    let path = fixtures_dir().join("exposure.xml");
    std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Failed to read exposure fixture from {:?}", path))
}

/// Lays out `Images-Disc1/GridSquare_<grid>/Data` with one document and one
/// MRC stack of `frames` frames per stem, returning the data directory.
pub fn write_session(root: &Path, grid: u64, frame_suffix: &str, frames: i32) -> PathBuf {
    let data = root
        .join("Images-Disc1")
        .join(format!("GridSquare_{}", grid))
        .join("Data");
    std::fs::create_dir_all(&data).expect("Failed to create session tree");

    let xml = exposure_xml();
    let header = MrcHeader { nx: 16, ny: 16, nz: frames, mode: 1 };
    for stem in STEMS {
        std::fs::write(data.join(format!("{}.xml", stem)), &xml)
            .expect("Failed to write exposure document");
        std::fs::write(data.join(format!("{}{}", stem, frame_suffix)), header.to_bytes())
            .expect("Failed to write frame stack");
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_dir_exists() {
        let dir = fixtures_dir();
        assert!(dir.exists(), "Fixtures directory should exist");
    }

    #[test]
    fn test_exposure_fixture() {
        assert!(exposure_xml().contains("MicroscopeImage"));
    }
}
