use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cryoflow::{logging, registry_from_config, SessionScanner};
use cryoflow_core::{AppConfig, Category, PluginSelection};
use cryoflow_meta::{parse_filename, FilenameTokens};
use cryoflow_plugin_api::{CallArgs, PluginRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Cryoflow - contract-checked plugins for cryo-EM preprocessing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (CRYOFLOW__* variables override it)
    #[arg(short, long, env = "CRYOFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered plugins and the operations they implement
    Plugins,

    /// Extract the metadata of one exposure document
    Meta {
        /// Metadata XML written next to the movie
        xml: PathBuf,

        #[command(flatten)]
        plugin: PluginArgs,
    },

    /// Parse the acquisition tokens of a movie path
    Filename {
        path: String,
    },

    /// Scan a session directory for exposures and frames
    Scan {
        dir: PathBuf,

        #[command(flatten)]
        plugin: PluginArgs,
    },
}

/// Acquisition software selection; falls back to the configured one.
#[derive(clap::Args, Debug)]
struct PluginArgs {
    #[arg(long)]
    software: Option<String>,

    #[arg(long)]
    hardware: Option<String>,

    #[arg(long = "software-version")]
    software_version: Option<String>,
}

impl PluginArgs {
    fn selection(&self, config: &AppConfig) -> PluginSelection {
        let configured = config.selection(Category::Software);
        let pick = |flag: &Option<String>, from_config: Option<&String>, default: &str| {
            flag.clone()
                .or_else(|| from_config.cloned())
                .unwrap_or_else(|| default.to_string())
        };

        PluginSelection {
            category: Category::Software,
            software: pick(&self.software, configured.map(|s| &s.software), "EPU"),
            hardware: pick(&self.hardware, configured.map(|s| &s.hardware), "Falcon"),
            version: self
                .software_version
                .clone()
                .or_else(|| configured.and_then(|s| s.version.clone())),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn print<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_config_builder(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => AppConfig::default(),
    };
    if args.verbose {
        config.logging.level = "debug".to_string();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[derive(Serialize)]
struct FilenameReport {
    path: String,
    matched: bool,
    spot_pair: Option<(u64, u64)>,
    acquired_at: Option<String>,
    record: cryoflow_meta::MetadataRecord,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    logging::init(&config.logging)?;

    info!(app = %config.app.name, "Cryoflow v{}", env!("CARGO_PKG_VERSION"));

    match &args.command {
        Command::Plugins => {
            let registry = registry_from_config(&config)?;
            print(args.output, &registry.list())
        }
        Command::Meta { xml, plugin } => {
            let registry = registry_from_config(&config)?;
            meta(&registry, plugin.selection(&config), xml, args.output)
        }
        Command::Filename { path } => {
            let tokens = FilenameTokens::parse(path);
            if tokens.is_none() {
                warn!(path = %path, "no acquisition pattern in path");
            }
            let report = FilenameReport {
                path: path.clone(),
                matched: tokens.is_some(),
                spot_pair: tokens.as_ref().and_then(FilenameTokens::spot_pair),
                acquired_at: tokens
                    .as_ref()
                    .and_then(FilenameTokens::acquired_at)
                    .map(|at| at.to_string()),
                record: parse_filename(path),
            };
            print(args.output, &report)
        }
        Command::Scan { dir, plugin } => {
            if !dir.is_dir() {
                bail!("Not a directory: {:?}", dir);
            }
            let registry = registry_from_config(&config)?;
            let selection = plugin.selection(&config);
            let scanner = SessionScanner::new(
                &registry,
                &selection.software,
                &selection.hardware,
                selection.version.as_deref(),
            )?
            .with_frame_count_timeout(config.dispatch.frame_count_timeout())
            .with_workers(config.app.worker_threads);

            let report = scanner.scan(dir).await?;
            info!(
                exposures = report.exposures.len(),
                failed = report.failed,
                timed_out = report.timed_out,
                "scan finished"
            );
            print(args.output, &report)
        }
    }
}

fn meta(
    registry: &PluginRegistry,
    selection: PluginSelection,
    xml: &Path,
    output: OutputFormat,
) -> Result<()> {
    let software = registry
        .resolve(&selection)
        .with_context(|| format!("No plugin for {}", selection))?;

    let args = CallArgs::new().arg(xml.to_string_lossy().into_owned());
    let value = software
        .dispatch("get_meta_data", &args)
        .with_context(|| format!("Failed to extract metadata from {:?}", xml))?;
    print(output, &value)
}
