//! crYOLO particle picking

use crate::command::{executable, settings, CommandLine};
use cryoflow_plugin_api::{CallArgs, FunctionTable, PluginResult, PluginValue};
use std::path::Path;

pub const SOFTWARE: &str = "crYOLO";
pub const HARDWARE: &str = "gpu";
pub const VERSIONS: [&str; 1] = ["1.7"];

const FILTER_CUTOFF: &str = "filter_cutoff";

/// Low-pass filtered copy of a micrograph for picking.
fn filter_command(args: &CallArgs) -> PluginResult<PluginValue> {
    let settings = settings(args)?;
    let file_input = args.str_arg(0, "file_input")?;
    let file_output = args.str_arg(1, "file_output")?;
    let cutoff = settings
        .get(FILTER_CUTOFF)
        .map(String::as_str)
        .unwrap_or("0.1");

    let command = CommandLine::new("e2proc2d.py")
        .arg(file_input)
        .arg(file_output)
        .arg(&format!("--process=filter.lowpass.gauss:cutoff_abs={}", cutoff))
        .build();
    Ok(PluginValue::from(command))
}

fn command(args: &CallArgs) -> PluginResult<PluginValue> {
    let settings = settings(args)?;
    let input_dir = args.str_arg(0, "input_dir")?;
    let output_dir = args.str_arg(1, "output_dir")?;
    let config = args.str_arg(2, "config")?;
    let weights = args.str_arg(3, "weights")?;

    let command = CommandLine::new(executable(&settings, "cryolo_predict.py"))
        .flag("-c", config)
        .flag("-w", weights)
        .flag("-i", input_dir)
        .flag("-o", output_dir)
        .settings_flags(&settings, &[])
        .build();
    Ok(PluginValue::from(command))
}

/// Box files crYOLO writes for one micrograph.
fn import_data(args: &CallArgs) -> PluginResult<PluginValue> {
    let output_dir = Path::new(args.str_arg(0, "output_dir")?);
    let root = args.str_arg(1, "root")?;
    Ok(PluginValue::str_list([
        output_dir
            .join("CBOX")
            .join(format!("{}.cbox", root))
            .to_string_lossy()
            .into_owned(),
        output_dir
            .join("EMAN")
            .join(format!("{}.box", root))
            .to_string_lossy()
            .into_owned(),
    ]))
}

pub fn table(version: &str) -> FunctionTable {
    FunctionTable::new(format!("{}-{}", SOFTWARE, version))
        .with("get_filter_command", filter_command)
        .with("get_import_data", import_data)
        .with("get_command", command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_predict_command() {
        let settings = BTreeMap::from([
            ("-t".to_string(), "0.3".to_string()),
            ("-g".to_string(), "0".to_string()),
        ]);
        let args = CallArgs::new()
            .kwarg("input_dir", "/filtered")
            .kwarg("output_dir", "/picked")
            .kwarg("config", "/cfg/config.json")
            .kwarg("weights", "/cfg/gmodel.h5")
            .kwarg("settings", settings);

        assert_eq!(
            command(&args).unwrap().as_str().unwrap(),
            "cryolo_predict.py -c /cfg/config.json -w /cfg/gmodel.h5 -i /filtered -o /picked -g 0 -t 0.3"
        );
    }

    #[test]
    fn test_filter_command_default_cutoff() {
        let args = CallArgs::new().arg("a.mrc").arg("b.mrc");
        assert_eq!(
            filter_command(&args).unwrap().as_str().unwrap(),
            "e2proc2d.py a.mrc b.mrc --process=filter.lowpass.gauss:cutoff_abs=0.1"
        );
    }

    #[test]
    fn test_import_data() {
        let args = CallArgs::new().arg("/picked").arg("FoilHole_1");
        assert_eq!(
            import_data(&args).unwrap().to_strings().unwrap(),
            vec!["/picked/CBOX/FoilHole_1.cbox", "/picked/EMAN/FoilHole_1.box"]
        );
    }
}
