//! Build orchestrator for turning a project into an SDKK package
//!
//! This module provides:
//! - Workflow coordination: compile → collect files → pack
//! - Skipping of duplicate or missing extra files with warnings
//! - A timestamped `BuildReport`

use crate::config::ProjectConfig;
use crate::error::{AppError, IoError};
use crate::package::{
    build_package, normalize_internal_path, PackageFile, PackageSpec, PackageSummary,
};
use crate::progress::Progress;
use crate::toolchain::{compile_to_raw_binary, CommandRunner, CompileOutcome, SystemRunner};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// File name of the compiled binary inside the scratch directory
const ENTRY_BINARY: &str = "entry_binary.bin";

/// Result of a full project build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub summary: PackageSummary,
    pub compile: CompileOutcome,
    /// Configuration, file-collection and packing warnings, in that order
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildReport {
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Orchestrator for building a project
pub struct Orchestrator<R: CommandRunner = SystemRunner> {
    config: ProjectConfig,
    runner: R,
}

impl Orchestrator<SystemRunner> {
    /// Create an orchestrator running the real toolchain
    pub fn new(config: ProjectConfig) -> Self {
        Self::with_runner(config, SystemRunner::new())
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Create an orchestrator with a custom command runner (for testing)
    pub fn with_runner(config: ProjectConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Build the project
    pub async fn run(&self, show_progress: bool) -> Result<BuildReport, AppError> {
        let mut progress = Progress::new(show_progress);
        let result = build_project(&self.config, &self.runner, &mut progress).await;
        progress.finish_and_clear();
        result
    }
}

/// Compile the project source and pack it with the configured extra files
///
/// The compiled binary is the entry module, stored as `<source stem>.bin`.
pub async fn build_project<R>(
    config: &ProjectConfig,
    runner: &R,
    progress: &mut Progress,
) -> Result<BuildReport, AppError>
where
    R: CommandRunner + ?Sized,
{
    let started_at = Utc::now();
    info!(package = %config.name, "building project");

    let scratch = tempfile::Builder::new()
        .prefix("sdkk-")
        .tempdir()
        .map_err(|e| IoError::from_io(std::env::temp_dir(), e))?;
    let binary = scratch.path().join(ENTRY_BINARY);

    progress.spinner(&format!("Compiling {}", config.build.source.display()));
    let compile =
        compile_to_raw_binary(&config.build.source, &binary, &config.compile_options(), runner)
            .await?;
    progress.step_done(&format!("Compiled {} ({} bytes)", config.name, compile.size));

    let main_internal = entry_module_name(&config.build.source);
    let mut warnings = config.warnings.clone();
    let mut spec = PackageSpec::new(&config.name, &config.version)
        .with_description(&config.description)
        .with_file(PackageFile::new(&binary, &main_internal))
        .with_entry(&main_internal);

    let mut seen = HashSet::from([main_internal]);
    for file in &config.files {
        let internal = normalize_internal_path(&file.internal_path);
        if internal.is_empty() {
            push_warning(
                &mut warnings,
                format!("skipping {}: empty internal path", file.host_path.display()),
            );
            continue;
        }
        if !file.host_path.is_file() {
            push_warning(
                &mut warnings,
                format!("skipping {}: file not found", file.host_path.display()),
            );
            continue;
        }
        if !seen.insert(internal.clone()) {
            push_warning(
                &mut warnings,
                format!(
                    "skipping {}: internal path '{}' already used",
                    file.host_path.display(),
                    internal
                ),
            );
            continue;
        }
        let mut file = file.clone();
        file.internal_path = internal;
        spec.files.push(file);
    }

    progress.spinner(&format!("Packing {} modules", spec.files.len()));
    let summary = build_package(&spec, &config.build.output)?;
    // Header truncation is already reported by the configuration
    for warning in &summary.warnings {
        if !warnings.contains(warning) {
            warnings.push(warning.clone());
        }
    }
    progress.step_done(&format!("Wrote {}", summary.path.display()));

    let finished_at = Utc::now();
    info!(
        output = %summary.path.display(),
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "project built"
    );

    Ok(BuildReport {
        summary,
        compile,
        warnings,
        started_at,
        finished_at,
    })
}

/// Internal path of the compiled entry module
pub fn entry_module_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "main".to_string());
    format!("{}.bin", stem)
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    warn!("{}", message);
    warnings.push(message);
}
