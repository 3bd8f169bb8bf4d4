//! Acquisition session scanning
//!
//! Finds every exposure below a session directory and gathers its metadata
//! and frame count through the registered EPU plugins. Plugin calls touch the
//! filesystem, so each one runs on a blocking worker; the frame count probe is
//! additionally bounded by a timeout.

use anyhow::{anyhow, Context, Result};
use cryoflow_plugin_api::{
    CallArgs, Category, ContractDispatcher, DispatchError, PluginRegistry, PluginSelection,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Findings for one exposure.
#[derive(Debug, Clone, Serialize)]
pub struct ExposureReport {
    pub meta_file: String,
    pub frames: Vec<String>,
    /// `None` when unknown or the probe timed out
    pub frame_count: Option<i64>,
    pub metadata: BTreeMap<String, String>,
    /// Set when the exposure could not be processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Findings for a whole session directory.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub frame_files: usize,
    pub exposures: Vec<ExposureReport>,
    pub timed_out: usize,
    pub failed: usize,
}

/// Scans session directories with one software/copy plugin pair.
#[derive(Clone)]
pub struct SessionScanner {
    software: ContractDispatcher,
    copy: ContractDispatcher,
    frame_count_timeout: Duration,
    workers: usize,
}

impl SessionScanner {
    /// Resolves the software and copy plugins for `software`/`hardware`.
    pub fn new(
        registry: &PluginRegistry,
        software: &str,
        hardware: &str,
        version: Option<&str>,
    ) -> Result<Self> {
        let select = |category| {
            let selection = PluginSelection::new(category, software, hardware);
            match version {
                Some(v) => selection.with_version(v),
                None => selection,
            }
        };

        Ok(Self {
            software: registry.resolve(&select(Category::Software))?,
            copy: registry.resolve(&select(Category::CopyExtern))?,
            frame_count_timeout: Duration::from_secs(30),
            workers: default_workers(),
        })
    }

    pub fn with_frame_count_timeout(mut self, timeout: Duration) -> Self {
        self.frame_count_timeout = timeout;
        self
    }

    /// Number of exposures processed at once; 0 means one per CPU.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { default_workers() } else { workers };
        self
    }

    pub async fn scan(&self, root: &Path) -> Result<ScanReport> {
        let (meta_files, frame_files) = self.find_all_files(root).await?;
        info!(
            root = %root.display(),
            exposures = meta_files.len(),
            frame_files,
            "scanning session"
        );

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, meta_file) in meta_files.into_iter().enumerate() {
            let scanner = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (index, scanner.exposure(meta_file).await)
            });
        }

        let mut exposures = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            exposures.push(joined.context("exposure task panicked")?);
        }
        exposures.sort_by_key(|(index, _)| *index);

        let exposures = exposures.into_iter().map(|(_, exposure)| exposure).collect();
        Ok(summarize(root, frame_files, exposures))
    }

    async fn find_all_files(&self, root: &Path) -> Result<(Vec<String>, usize)> {
        let copy = self.copy.clone();
        let args = CallArgs::new().arg(root.to_string_lossy().into_owned());

        let value = tokio::task::spawn_blocking(move || copy.dispatch("find_all_files", &args))
            .await
            .context("session walk panicked")?
            .with_context(|| format!("failed to scan {}", root.display()))?;

        match value.as_items() {
            Some([meta, frames]) => Ok((
                meta.to_strings().unwrap_or_default(),
                frames.to_strings().map(|f| f.len()).unwrap_or_default(),
            )),
            _ => Err(anyhow!("find_all_files returned {:?}", value)),
        }
    }

    /// Metadata and frame count of one exposure; the flag reports a timeout.
    async fn exposure(&self, meta_file: String) -> (ExposureReport, bool) {
        let mut report = ExposureReport {
            meta_file: meta_file.clone(),
            frames: Vec::new(),
            frame_count: None,
            metadata: BTreeMap::new(),
            error: None,
        };

        let software = self.software.clone();
        let path = meta_file.clone();
        let found = tokio::task::spawn_blocking(move || {
            let metadata = software.dispatch("get_meta_data", &CallArgs::new().arg(path.as_str()))?;
            let frames = software.dispatch("get_frames", &CallArgs::new().arg(path.as_str()))?;
            Ok::<_, DispatchError>((metadata, frames))
        })
        .await;

        let (metadata, frames) = match found {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                warn!(meta_file = %meta_file, error = %e, "exposure skipped");
                report.error = Some(e.to_string());
                return (report, false);
            }
            Err(e) => {
                report.error = Some(format!("worker failed: {}", e));
                return (report, false);
            }
        };

        report.metadata = metadata.as_map().cloned().unwrap_or_default();
        report.frames = frames.to_strings().unwrap_or_default();

        let software = self.software.clone();
        let args = CallArgs::from_positional(report.frames.clone());
        let probe = tokio::task::spawn_blocking(move || software.dispatch("get_number_of_frames", &args));

        match tokio::time::timeout(self.frame_count_timeout, probe).await {
            Ok(Ok(Ok(value))) => {
                report.frame_count = value.as_int();
                debug!(meta_file = %meta_file, frames = ?report.frame_count, "frame count");
                (report, false)
            }
            Ok(Ok(Err(e))) => {
                warn!(meta_file = %meta_file, error = %e, "frame count unknown");
                (report, false)
            }
            Ok(Err(e)) => {
                warn!(meta_file = %meta_file, error = %e, "frame count worker failed");
                (report, false)
            }
            Err(_) => {
                warn!(
                    meta_file = %meta_file,
                    timeout_secs = self.frame_count_timeout.as_secs_f64(),
                    "frame count probe timed out"
                );
                (report, true)
            }
        }
    }
}

fn summarize(root: &Path, frame_files: usize, exposures: Vec<(ExposureReport, bool)>) -> ScanReport {
    let timed_out = exposures.iter().filter(|(_, timed_out)| *timed_out).count();
    let exposures: Vec<ExposureReport> = exposures.into_iter().map(|(r, _)| r).collect();
    let failed = exposures.iter().filter(|r| r.error.is_some()).count();

    ScanReport {
        root: root.to_path_buf(),
        frame_files,
        exposures,
        timed_out,
        failed,
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

