//! # Cryoflow Plugins
//!
//! Function tables for the acquisition software and external programs the
//! pipeline drives, and a builder registering all of them.
//!
//! | Category | Software | Hardware | Versions |
//! |---|---|---|---|
//! | software, copy_extern | EPU | Falcon, K2 | 1.9, 2.0 |
//! | motion | MotionCor2 | gpu | 1.2.1, 1.4.0 |
//! | ctf | CTFFIND4 | cpu | 4.1.14 |
//! | picking | crYOLO | gpu | 1.7 |
//! | compress | mrc2tif | cpu | 4.11 |
//!
//! ## Example
//!
//! ```
//! use cryoflow_plugin_api::{CallArgs, Category, PluginSelection, ShapeCheck};
//! use cryoflow_plugins::default_registry;
//!
//! let registry = default_registry(ShapeCheck::Strict);
//! let compress = registry
//!     .resolve(&PluginSelection::new(Category::Compress, "mrc2tif", "cpu"))
//!     .unwrap();
//!
//! let args = CallArgs::new().arg("movie.mrc").arg("movie.tif");
//! let command = compress.dispatch("get_command", &args).unwrap();
//! assert_eq!(command.as_str(), Some("mrc2tif -s -c lzw movie.mrc movie.tif"));
//! ```

pub mod command;
pub mod compress;
pub mod cryolo;
pub mod ctffind;
pub mod epu;
pub mod motioncor2;
pub mod mrc;

use cryoflow_meta::{LevelSpec, MetadataExtractor};
use cryoflow_plugin_api::{Category, PluginRegistry, ShapeCheck};
use std::sync::Arc;

/// Registry with every built-in plugin and the EPU level specification.
pub fn default_registry(shape_check: ShapeCheck) -> PluginRegistry {
    build_registry(shape_check, LevelSpec::epu())
}

/// Registry with every built-in plugin, extracting EPU metadata with `spec`.
pub fn build_registry(shape_check: ShapeCheck, spec: LevelSpec) -> PluginRegistry {
    let registry = PluginRegistry::new(shape_check);
    let extractor = Arc::new(MetadataExtractor::new(spec));

    for hardware in epu::HARDWARE {
        for version in epu::VERSIONS {
            let profile = epu::HardwareProfile::new(hardware, version);
            registry.register(
                Category::Software,
                epu::SOFTWARE,
                hardware,
                version,
                epu::software_table(profile.clone(), Arc::clone(&extractor)),
            );
            registry.register(
                Category::CopyExtern,
                epu::SOFTWARE,
                hardware,
                version,
                epu::copy_extern_table(profile),
            );
        }
    }

    for version in motioncor2::VERSIONS {
        registry.register(
            Category::Motion,
            motioncor2::SOFTWARE,
            motioncor2::HARDWARE,
            version,
            motioncor2::table(version),
        );
    }

    for version in ctffind::VERSIONS {
        registry.register(
            Category::Ctf,
            ctffind::SOFTWARE,
            ctffind::HARDWARE,
            version,
            ctffind::table(version),
        );
    }

    for version in cryolo::VERSIONS {
        registry.register(
            Category::Picking,
            cryolo::SOFTWARE,
            cryolo::HARDWARE,
            version,
            cryolo::table(version),
        );
    }

    for version in compress::VERSIONS {
        registry.register(
            Category::Compress,
            compress::SOFTWARE,
            compress::HARDWARE,
            version,
            compress::table(version),
        );
    }

    registry.log_summary();
    registry
}
