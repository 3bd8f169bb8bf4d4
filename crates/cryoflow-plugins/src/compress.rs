//! Movie compression with IMOD `mrc2tif`

use crate::command::{executable, settings, CommandLine};
use cryoflow_plugin_api::{CallArgs, FunctionTable, PluginValue};

pub const SOFTWARE: &str = "mrc2tif";
pub const HARDWARE: &str = "cpu";
pub const VERSIONS: [&str; 1] = ["4.11"];

pub fn table(version: &str) -> FunctionTable {
    FunctionTable::new(format!("{}-{}", SOFTWARE, version))
        .with("get_command", |args: &CallArgs| {
            let settings = settings(args)?;
            let file_input = args.str_arg(0, "file_input")?;
            let file_output = args.str_arg(1, "file_output")?;
            let compression = settings.get("-c").map(String::as_str).unwrap_or("lzw");

            let command = CommandLine::new(executable(&settings, SOFTWARE))
                .arg("-s")
                .flag("-c", compression)
                .settings_flags(&settings, &["-c"])
                .arg(file_input)
                .arg(file_output)
                .build();
            Ok(PluginValue::from(command))
        })
        .with("get_output_files", |args: &CallArgs| {
            Ok(PluginValue::str_list([args.str_arg(1, "file_output")?]))
        })
}
