//! Output formatting for command results
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::InitOutcome;
use crate::deploy::DeployOutcome;
use crate::deps::ResolvedDependency;
use crate::format::{ModuleEntry, PackageHeader};
use crate::orchestrator::BuildReport;
use crate::package::{PackageReader, PackageSummary, VerifyReport};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only the essential result line
    Quiet,
    #[default]
    Normal,
    /// Adds command lines, offsets and timings
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            color: true,
        }
    }
}

impl OutputConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Header and entries of an opened package, for `inspect`
#[derive(Debug, Clone, Copy)]
pub struct PackageInfo<'a> {
    pub path: &'a Path,
    pub header: &'a PackageHeader,
    pub entries: &'a [ModuleEntry],
    pub file_size: u64,
    pub checksum_ok: bool,
}

impl<'a> PackageInfo<'a> {
    pub fn from_reader(reader: &'a PackageReader) -> Self {
        Self {
            path: reader.path(),
            header: reader.header(),
            entries: reader.entries(),
            file_size: reader.file_size(),
            checksum_ok: reader.checksum_ok(),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Result of `sdkk build`
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Result of `sdkk pack`
    fn format_package(
        &self,
        summary: &PackageSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;

    fn format_inspect(&self, info: &PackageInfo<'_>, writer: &mut dyn Write)
        -> std::io::Result<()>;

    fn format_verify(&self, report: &VerifyReport, writer: &mut dyn Write) -> std::io::Result<()>;

    fn format_extract(
        &self,
        dest: &Path,
        files: &[PathBuf],
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;

    fn format_deps(
        &self,
        source: &Path,
        deps: &[ResolvedDependency],
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;

    fn format_deploy(
        &self,
        outcome: &DeployOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()>;

    fn format_init(&self, outcome: &InitOutcome, writer: &mut dyn Write) -> std::io::Result<()>;
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_config_default() {
        let config = OutputConfig::default();
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert!(config.color);
    }

    #[test]
    fn test_output_config_from_cli_json() {
        let config = OutputConfig::from_cli(true, false, false);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_output_config_from_cli_quiet_wins() {
        let config = OutputConfig::from_cli(false, true, true);
        assert_eq!(config.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn test_output_config_from_cli_verbose() {
        let config = OutputConfig::from_cli(false, true, false).with_color(false);
        assert_eq!(config.verbosity, Verbosity::Verbose);
        assert!(!config.color);
    }
}
