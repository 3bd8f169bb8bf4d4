//! Shell command assembly shared by the program plugins

use cryoflow_plugin_api::{CallArgs, DispatchError, PluginResult};
use std::collections::BTreeMap;

/// Keyword argument carrying the program settings
pub const SETTINGS: &str = "settings";

/// Settings key naming the executable
pub const EXECUTABLE: &str = "executable";

/// Quotes an argument for a POSIX shell when needed.
pub fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Incrementally built command line.
#[derive(Debug, Clone, Default)]
pub struct CommandLine {
    parts: Vec<String>,
}

impl CommandLine {
    pub fn new(program: &str) -> Self {
        Self {
            parts: vec![quote(program)],
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.parts.push(quote(arg));
        self
    }

    pub fn args<'a, I: IntoIterator<Item = &'a str>>(mut self, args: I) -> Self {
        self.parts.extend(args.into_iter().map(quote));
        self
    }

    pub fn flag(self, flag: &str, value: &str) -> Self {
        self.arg(flag).arg(value)
    }

    /// Appends every `-flag value...` setting in key order. Values are split on
    /// whitespace; empty values and the flags listed in `except` are skipped.
    pub fn settings_flags(mut self, settings: &BTreeMap<String, String>, except: &[&str]) -> Self {
        for (flag, value) in settings {
            if !flag.starts_with('-') || except.contains(&flag.as_str()) {
                continue;
            }
            if value.trim().is_empty() {
                continue;
            }
            self = self.arg(flag).args(value.split_whitespace());
        }
        self
    }

    pub fn build(self) -> String {
        self.parts.join(" ")
    }
}

/// Program settings passed as the `settings` keyword; empty when absent.
pub fn settings(args: &CallArgs) -> PluginResult<BTreeMap<String, String>> {
    match args.keyword(SETTINGS) {
        None => Ok(BTreeMap::new()),
        Some(_) => args.map_kwarg(SETTINGS).cloned(),
    }
}

/// Executable from the settings, or the program's default name.
pub fn executable<'a>(settings: &'a BTreeMap<String, String>, default: &'a str) -> &'a str {
    settings
        .get(EXECUTABLE)
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}

/// Integer-valued setting, `default` when absent.
pub fn int_setting(settings: &BTreeMap<String, String>, key: &str, default: i64) -> PluginResult<i64> {
    match settings.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            DispatchError::invalid_argument(format!("setting '{}' is not an integer: {}", key, raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("/data/movie.mrc"), "/data/movie.mrc");
        assert_eq!(quote("my movie.mrc"), "'my movie.mrc'");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[test]
    fn test_settings_flags() {
        let settings = BTreeMap::from([
            ("-Gpu".to_string(), "0 1".to_string()),
            ("-Patch".to_string(), "".to_string()),
            ("-Throw".to_string(), "2".to_string()),
            ("executable".to_string(), "/opt/mc2".to_string()),
        ]);
        let cmd = CommandLine::new("prog")
            .settings_flags(&settings, &["-Throw"])
            .build();
        assert_eq!(cmd, "prog -Gpu 0 1");
    }

    #[test]
    fn test_int_setting() {
        let settings = BTreeMap::from([("-Throw".to_string(), " 3 ".to_string())]);
        assert_eq!(int_setting(&settings, "-Throw", 0).unwrap(), 3);
        assert_eq!(int_setting(&settings, "-Trunc", 1).unwrap(), 1);

        let bad = BTreeMap::from([("-Throw".to_string(), "x".to_string())]);
        assert!(int_setting(&bad, "-Throw", 0).is_err());
    }
}
