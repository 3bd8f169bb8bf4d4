//! CTFFIND4 contrast transfer function estimation
//!
//! CTFFIND4 reads its parameters interactively, so the command feeds the
//! answers through a here-document in prompt order.

use crate::command::{executable, quote, settings};
use cryoflow_plugin_api::{CallArgs, FunctionTable, PluginResult, PluginValue};
use std::collections::BTreeMap;
use std::path::Path;

pub const SOFTWARE: &str = "CTFFIND4";
pub const HARDWARE: &str = "cpu";
pub const VERSIONS: [&str; 1] = ["4.1.14"];

/// Prompts after the input and output file names, with their defaults.
const PROMPTS: [(&str, &str); 17] = [
    ("Pixel size", "1.0"),
    ("Acceleration voltage", "300.0"),
    ("Spherical aberration", "2.70"),
    ("Amplitude contrast", "0.07"),
    ("Size of amplitude spectrum to compute", "512"),
    ("Minimum resolution", "30.0"),
    ("Maximum resolution", "5.0"),
    ("Minimum defocus", "5000.0"),
    ("Maximum defocus", "50000.0"),
    ("Defocus search step", "500.0"),
    ("Do you know what astigmatism is present?", "no"),
    ("Slower, more exhaustive search?", "no"),
    ("Use a restraint on astigmatism?", "no"),
    ("Find additional phase shift?", "no"),
    ("Determine sample tilt?", "no"),
    ("Do you want to set expert options?", "no"),
    ("Resample micrograph if pixel size too small?", "yes"),
];

fn stem(file_output: &str) -> String {
    Path::new(file_output)
        .with_extension("")
        .to_string_lossy()
        .into_owned()
}

fn command(args: &CallArgs) -> PluginResult<PluginValue> {
    let settings = settings(args)?;
    let file_input = args.str_arg(0, "file_input")?;
    let file_output = args.str_arg(1, "file_output")?;

    let mut lines = vec![
        format!("{} << eof", quote(executable(&settings, "ctffind"))),
        file_input.to_string(),
        file_output.to_string(),
    ];
    lines.extend(PROMPTS.iter().map(|(prompt, default)| answer(&settings, prompt, default)));
    lines.push("eof".to_string());

    Ok(PluginValue::from(lines.join("\n")))
}

fn answer(settings: &BTreeMap<String, String>, prompt: &str, default: &str) -> String {
    settings
        .get(prompt)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

pub fn table(version: &str) -> FunctionTable {
    FunctionTable::new(format!("{}-{}", SOFTWARE, version))
        .with("get_command", command)
        .with("get_import_data", |args| {
            let output = args.str_arg(1, "file_output")?;
            Ok(PluginValue::str_list([format!("{}.txt", stem(output))]))
        })
        .with("get_output_files", |args| {
            let output = args.str_arg(1, "file_output")?;
            let stem = stem(output);
            Ok(PluginValue::str_list([
                output.to_string(),
                format!("{}.txt", stem),
                format!("{}_avrot.txt", stem),
            ]))
        })
}
