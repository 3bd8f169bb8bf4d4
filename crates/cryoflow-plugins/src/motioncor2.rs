//! MotionCor2 beam-induced motion correction

use crate::command::{executable, int_setting, settings, CommandLine};
use cryoflow_plugin_api::{CallArgs, DispatchError, FunctionTable, PluginResult, PluginValue};
use std::path::Path;

pub const SOFTWARE: &str = "MotionCor2";
pub const HARDWARE: &str = "gpu";
pub const VERSIONS: [&str; 2] = ["1.2.1", "1.4.0"];

const THROW: &str = "-Throw";
const TRUNC: &str = "-Trunc";

/// Numeric `major.minor.patch` components; missing or non-numeric parts count as 0.
fn version_parts(version: &str) -> [u64; 3] {
    let mut parts = [0; 3];
    for (slot, part) in parts.iter_mut().zip(version.trim().split('.')) {
        *slot = part.parse().unwrap_or(0);
    }
    parts
}

/// Input flag for a movie file; EER input needs 1.4 or newer.
fn input_flag(file_input: &str, version: &str) -> PluginResult<&'static str> {
    let extension = Path::new(file_input)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "tif" | "tiff" => Ok("-InTiff"),
        "eer" if version_parts(version) >= [1, 4, 0] => Ok("-InEer"),
        "eer" => Err(DispatchError::invalid_argument(format!(
            "{} {} cannot read EER movies",
            SOFTWARE, version
        ))),
        _ => Ok("-InMrc"),
    }
}

/// First and last frame used for the aligned sum, 1-based.
fn frame_range(args: &CallArgs) -> PluginResult<PluginValue> {
    let settings = settings(args)?;
    let frames = args
        .keyword("frames")
        .or_else(|| args.get(0))
        .and_then(PluginValue::as_int)
        .ok_or_else(|| DispatchError::invalid_argument("expected the movie frame count 'frames'"))?;

    let first = int_setting(&settings, THROW, 0)? + 1;
    let last = frames - int_setting(&settings, TRUNC, 0)?;
    if last < first {
        return Err(DispatchError::invalid_argument(format!(
            "{} and {} leave no frames out of {}",
            THROW, TRUNC, frames
        )));
    }
    Ok(PluginValue::tuple([first.into(), last.into()]))
}

/// Files written for one movie that later stages import.
fn import_data(args: &CallArgs) -> PluginResult<PluginValue> {
    let output = Path::new(args.str_arg(1, "file_output")?);
    let stem = output.with_extension("");
    let stem = stem.to_string_lossy();
    Ok(PluginValue::str_list([
        format!("{}.mrc", stem),
        format!("{}_DW.mrc", stem),
        format!("{}.log", stem),
    ]))
}

pub fn table(version: &str) -> FunctionTable {
    let command_version = version.to_string();

    FunctionTable::new(format!("{}-{}", SOFTWARE, version))
        .with("get_frame_range", frame_range)
        .with("get_import_data", import_data)
        .with("get_command", move |args| {
            let settings = settings(args)?;
            let file_input = args.str_arg(0, "file_input")?;
            let file_output = args.str_arg(1, "file_output")?;

            let command = CommandLine::new(executable(&settings, SOFTWARE))
                .flag(input_flag(file_input, &command_version)?, file_input)
                .flag("-OutMrc", file_output)
                .settings_flags(&settings, &[])
                .build();
            Ok(PluginValue::from(command))
        })
}
