//! EPU acquisition software
//!
//! EPU writes one XML document per exposure next to its movie, under
//! `Images-Disc*/GridSquare_<id>/Data/`. The hardware decides how the movie is
//! stored: the Falcon under EPU 1.9 writes one file per frame, every other
//! combination writes a single MRC stack.

use crate::command::CommandLine;
use crate::mrc::MrcHeader;
use cryoflow_meta::extract::DOSE_ON_CAMERA;
use cryoflow_meta::{
    derive_dose_on_camera, parse_filename, FilenameTokens, MetadataError, MetadataExtractor,
};
use cryoflow_plugin_api::{CallArgs, DispatchError, FunctionTable, PluginResult, PluginValue};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const SOFTWARE: &str = "EPU";
pub const HARDWARE: [&str; 2] = ["Falcon", "K2"];
pub const VERSIONS: [&str; 2] = ["1.9", "2.0"];

/// Suffix of the per-exposure metadata document
pub const META_SUFFIX: &str = ".xml";

/// How a camera stores the frames of one exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLayout {
    /// One file per frame
    PerFile,
    /// One MRC stack holding every frame
    Stack,
}

/// Storage conventions of one hardware/version combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareProfile {
    pub hardware: String,
    pub version: String,
    pub frame_suffix: &'static str,
    pub layout: FrameLayout,
}

impl HardwareProfile {
    pub fn new(hardware: &str, version: &str) -> Self {
        let (frame_suffix, layout) = match (hardware, version) {
            ("Falcon", "1.9") => (".mrc", FrameLayout::PerFile),
            ("Falcon", _) => ("_Fractions.mrc", FrameLayout::Stack),
            _ => ("_frames.mrc", FrameLayout::Stack),
        };

        Self {
            hardware: hardware.to_string(),
            version: version.to_string(),
            frame_suffix,
            layout,
        }
    }

    /// Frames of the exposure `stem` in `dir`, sorted.
    ///
    /// A file belongs to the exposure when its name starts with the stem, ends
    /// with the frame suffix and is not the metadata document itself.
    pub fn frames_in(&self, dir: &Path, stem: &str) -> PluginResult<Vec<String>> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_frame_of(&name, stem) {
                frames.push(entry.path().to_string_lossy().into_owned());
            }
        }
        frames.sort();
        Ok(frames)
    }

    fn is_frame_of(&self, name: &str, stem: &str) -> bool {
        let Some(rest) = name.strip_prefix(stem) else {
            return false;
        };
        match self.layout {
            FrameLayout::PerFile => rest.starts_with('-') && rest.ends_with(self.frame_suffix),
            FrameLayout::Stack => rest == self.frame_suffix,
        }
    }

    fn is_any_frame(&self, name: &str) -> bool {
        name.starts_with("FoilHole_") && name.ends_with(self.frame_suffix)
    }

    /// Frame count of an exposure, `None` when it cannot be determined.
    pub fn count_frames(&self, frames: &[&str]) -> Option<i64> {
        match self.layout {
            FrameLayout::PerFile => (!frames.is_empty()).then_some(frames.len() as i64),
            FrameLayout::Stack => {
                let first = frames.first()?;
                match MrcHeader::read(first) {
                    Ok(header) => Some(i64::from(header.nz)),
                    Err(e) => {
                        warn!(path = %first, error = %e, "could not read frame count from stack header");
                        None
                    }
                }
            }
        }
    }
}

fn path_arg<'a>(args: &'a CallArgs, index: usize, name: &str) -> PluginResult<&'a Path> {
    args.str_arg(index, name).map(Path::new)
}

fn stem_of(path: &Path) -> PluginResult<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            DispatchError::invalid_argument(format!("{} has no file name", path.display()))
        })
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Splits positional strings into frames and a trailing output path.
fn frames_and_output(args: &CallArgs) -> PluginResult<(Vec<&str>, &str)> {
    let mut positional = args.positional_strs()?;
    let output = match args.keyword("file_output").and_then(PluginValue::as_str) {
        Some(output) => output,
        None => positional.pop().ok_or_else(|| {
            DispatchError::invalid_argument("expected frames followed by an output path")
        })?,
    };
    if positional.is_empty() {
        return Err(DispatchError::invalid_argument("no frames given"));
    }
    Ok((positional, output))
}

/// Metadata of one exposure: XML walk, derived dose and filename tokens.
pub fn meta_data(extractor: &MetadataExtractor, xml_path: &Path) -> PluginResult<BTreeMap<String, String>> {
    let mut record = extractor.extract_file(xml_path)?;

    match derive_dose_on_camera(&mut record) {
        Ok(()) => {}
        Err(MetadataError::MissingField(field)) => {
            debug!(path = %xml_path.display(), field = %field, "{} not derived", DOSE_ON_CAMERA);
        }
        Err(e) => return Err(e.into()),
    }

    record.merge(parse_filename(&xml_path.to_string_lossy()));
    Ok(record.into_inner())
}

/// Software table for one hardware/version combination.
pub fn software_table(profile: HardwareProfile, extractor: Arc<MetadataExtractor>) -> FunctionTable {
    let profile = Arc::new(profile);

    let info = {
        let profile = Arc::clone(&profile);
        move |_: &CallArgs| -> PluginResult<PluginValue> {
            let info = BTreeMap::from([
                ("software".to_string(), SOFTWARE.to_string()),
                ("hardware".to_string(), profile.hardware.clone()),
                ("version".to_string(), profile.version.clone()),
                ("frame_suffix".to_string(), profile.frame_suffix.to_string()),
                ("meta_suffix".to_string(), META_SUFFIX.to_string()),
            ]);
            Ok(PluginValue::Map(info))
        }
    };

    let frames = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let root = path_arg(args, 0, "root")?;
            let frames = profile.frames_in(parent_of(root), &stem_of(root)?)?;
            Ok(PluginValue::str_list(frames))
        }
    };

    let count = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let frames = args.positional_strs()?;
            Ok(profile.count_frames(&frames).into())
        }
    };

    let meta = move |args: &CallArgs| -> PluginResult<PluginValue> {
        let xml = path_arg(args, 0, "xml_path")?;
        Ok(PluginValue::Map(meta_data(&extractor, xml)?))
    };

    FunctionTable::new(format!("{}-{}-{}", SOFTWARE, profile.hardware, profile.version))
        .with("get_meta_info", info)
        .with("get_frames", frames)
        .with("get_number_of_frames", count)
        .with("get_meta_data", meta)
        .with("get_command", |args| {
            let (frames, output) = frames_and_output(args)?;
            Ok(PluginValue::from(
                CommandLine::new("newstack").args(frames).arg(output).build(),
            ))
        })
}

/// Copy helpers working on an EPU session tree.
pub fn copy_extern_table(profile: HardwareProfile) -> FunctionTable {
    let profile = Arc::new(profile);

    let find_frames = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let root = path_arg(args, 0, "root")?;
            let dir = args
                .keyword("frame_folder")
                .and_then(PluginValue::as_str)
                .map(Path::new)
                .unwrap_or_else(|| parent_of(root));
            Ok(PluginValue::str_list(profile.frames_in(dir, &stem_of(root)?)?))
        }
    };

    let check = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let frames = args.positional_strs()?;
            let expected = args.keyword("expected_frames").and_then(PluginValue::as_int);
            let found = profile.count_frames(&frames);

            let complete = match (found, expected) {
                (Some(found), Some(expected)) => found == expected,
                (Some(found), None) => found > 0,
                (None, _) => false,
            };
            let summary = match (found, expected) {
                (Some(found), Some(expected)) => format!("{}/{}", found, expected),
                (Some(found), None) => found.to_string(),
                (None, _) => "unknown".to_string(),
            };
            Ok(PluginValue::tuple([summary.into(), complete.into()]))
        }
    };

    let related = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let jpg = path_arg(args, 0, "jpg")?;
            let dir = parent_of(jpg);
            let stem = stem_of(jpg)?;
            let xml = dir.join(format!("{}{}", stem, META_SUFFIX));
            let frames = dir.join(format!("{}*{}", stem, profile.frame_suffix));
            Ok(PluginValue::tuple([
                stem.into(),
                xml.to_string_lossy().into_owned().into(),
                frames.to_string_lossy().into_owned().into(),
            ]))
        }
    };

    let all_files = {
        let profile = Arc::clone(&profile);
        move |args: &CallArgs| -> PluginResult<PluginValue> {
            let root = path_arg(args, 0, "root")?;
            let (meta, frames) = find_all_files(&profile, root)?;
            Ok(PluginValue::tuple([meta.into(), frames.into()]))
        }
    };

    FunctionTable::new(format!("{}-{}-{}-copy", SOFTWARE, profile.hardware, profile.version))
        .with("extract_time_and_grid_information", |args| {
            let path = args.str_arg(0, "root")?;
            let tokens = FilenameTokens::parse(path).ok_or_else(|| {
                DispatchError::invalid_argument(format!("{} is not an EPU exposure name", path))
            })?;
            Ok(time_and_grid(&tokens))
        })
        .with("find_frames", find_frames)
        .with("check_nr_frames", check)
        .with("find_related_frames_to_jpg", related)
        .with("get_copy_command_for_frames", |args| {
            let (frames, destination) = frames_and_output(args)?;
            let destination = format!("{}/", destination.trim_end_matches('/'));
            Ok(PluginValue::from(
                CommandLine::new("rsync")
                    .arg("-a")
                    .args(frames)
                    .arg(&destination)
                    .build(),
            ))
        })
        .with("find_all_files", all_files)
}

/// `(date_time, grid_square, hole, spot1, spot2)`; grid square empty when absent.
fn time_and_grid(tokens: &FilenameTokens) -> PluginValue {
    let date_time = match tokens.acquired_at() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}_{}", tokens.date, tokens.time),
    };
    PluginValue::tuple([
        date_time.into(),
        tokens
            .grid_square
            .map(|g| g.to_string())
            .unwrap_or_default()
            .into(),
        tokens.hole_number.to_string().into(),
        tokens.spot.0.clone().into(),
        tokens.spot.1.clone().into(),
    ])
}

/// Metadata documents and frame files below `root`.
pub fn find_all_files(
    profile: &HardwareProfile,
    root: &Path,
) -> PluginResult<(BTreeSet<String>, BTreeSet<String>)> {
    if !root.is_dir() {
        return Err(DispatchError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Directory not found: {}", root.display()),
        )));
    }

    let mut meta = BTreeSet::new();
    let mut frames = BTreeSet::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        let path = entry.path().to_string_lossy().into_owned();

        if name.ends_with(META_SUFFIX) && FilenameTokens::parse(&path).is_some() {
            meta.insert(path);
        } else if profile.is_any_frame(&name) {
            frames.insert(path);
        }
    }

    debug!(root = %root.display(), meta = meta.len(), frames = frames.len(), "scanned session tree");
    Ok((meta, frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const STEM: &str = "FoilHole_28385656_Data_28397105_28397106_20180530_0221";

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_profiles() {
        assert_eq!(HardwareProfile::new("Falcon", "1.9").layout, FrameLayout::PerFile);
        assert_eq!(HardwareProfile::new("Falcon", "2.0").frame_suffix, "_Fractions.mrc");
        assert_eq!(HardwareProfile::new("K2", "1.9").frame_suffix, "_frames.mrc");
    }

    #[test]
    fn test_per_file_frames() {
        let dir = tempfile::tempdir().unwrap();
        let xml = touch(dir.path(), &format!("{}.xml", STEM));
        touch(dir.path(), &format!("{}.jpg", STEM));
        touch(dir.path(), &format!("{}-0001.mrc", STEM));
        touch(dir.path(), &format!("{}-0000.mrc", STEM));
        touch(dir.path(), "FoilHole_1_Data_2_3_20180530_0222-0000.mrc");

        let profile = HardwareProfile::new("Falcon", "1.9");
        let frames = profile.frames_in(parent_of(&xml), STEM).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].ends_with("-0000.mrc"));

        let refs: Vec<&str> = frames.iter().map(String::as_str).collect();
        assert_eq!(profile.count_frames(&refs), Some(2));
        assert_eq!(profile.count_frames(&[]), None);
    }

    #[test]
    fn test_stack_frame_count_from_header() {
        let dir = tempfile::tempdir().unwrap();
        let stack = dir.path().join(format!("{}_Fractions.mrc", STEM));
        let header = MrcHeader { nx: 8, ny: 8, nz: 40, mode: 1 };
        std::fs::write(&stack, header.to_bytes()).unwrap();

        let profile = HardwareProfile::new("Falcon", "2.0");
        let frames = profile.frames_in(dir.path(), STEM).unwrap();
        assert_eq!(frames.len(), 1);

        let path = stack.to_string_lossy().into_owned();
        assert_eq!(profile.count_frames(&[path.as_str()]), Some(40));

        let broken = touch(dir.path(), "broken_Fractions.mrc");
        let broken = broken.to_string_lossy().into_owned();
        assert_eq!(profile.count_frames(&[broken.as_str()]), None);
    }

    #[test]
    fn test_time_and_grid() {
        let tokens = FilenameTokens::parse(&format!("GridSquare_5/Data/{}.jpg", STEM)).unwrap();
        assert_eq!(
            time_and_grid(&tokens),
            PluginValue::tuple([
                "2018-05-30 02:21:00".into(),
                "5".into(),
                "28385656".into(),
                "28397105".into(),
                "28397106".into(),
            ])
        );
    }
}
