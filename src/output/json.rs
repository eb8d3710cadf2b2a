//! JSON output formatter for machine processing
//!
//! This module provides:
//! - JSON views of package headers and module entries
//! - Structured build, verify, deps and deploy results

use crate::config::InitOutcome;
use crate::deploy::DeployOutcome;
use crate::deps::ResolvedDependency;
use crate::format::{to_hex, ModuleEntry, PackageHeader};
use crate::orchestrator::BuildReport;
use crate::output::{OutputFormatter, PackageInfo, Verbosity};
use crate::package::{PackageSummary, VerifyReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn write_json<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)
    }
}

#[derive(Serialize)]
struct JsonHeader {
    name: String,
    version: String,
    description: String,
    format_version: u32,
    entry_count: u32,
    entries_table_offset: u64,
    data_section_offset: u64,
    data_section_size: u64,
    data_sha256: String,
    checksum: String,
}

impl From<&PackageHeader> for JsonHeader {
    fn from(header: &PackageHeader) -> Self {
        Self {
            name: header.name.clone(),
            version: header.version.clone(),
            description: header.description.clone(),
            format_version: header.format_version,
            entry_count: header.entry_count,
            entries_table_offset: header.entries_table_offset,
            data_section_offset: header.data_section_offset,
            data_section_size: header.data_section_size,
            data_sha256: to_hex(&header.data_sha256),
            checksum: format!("{:#010x}", header.checksum),
        }
    }
}

#[derive(Serialize)]
struct JsonEntry {
    name: String,
    offset: u64,
    size: u64,
    #[serde(rename = "type")]
    module_type: &'static str,
    flags: Vec<&'static str>,
    flag_bits: u32,
    signed: bool,
}

impl From<&ModuleEntry> for JsonEntry {
    fn from(entry: &ModuleEntry) -> Self {
        Self {
            name: entry.name.clone(),
            offset: entry.offset,
            size: entry.size,
            module_type: entry.module_type.label(),
            flags: entry.flags.names(),
            flag_bits: entry.flags.bits(),
            signed: entry.is_signed(),
        }
    }
}

#[derive(Serialize)]
struct JsonPackage {
    path: PathBuf,
    total_size: u64,
    header: JsonHeader,
    entries: Vec<JsonEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl From<&PackageSummary> for JsonPackage {
    fn from(summary: &PackageSummary) -> Self {
        Self {
            path: summary.path.clone(),
            total_size: summary.total_size,
            header: JsonHeader::from(&summary.header),
            entries: summary.entries.iter().map(JsonEntry::from).collect(),
            warnings: summary.warnings.clone(),
        }
    }
}

#[derive(Serialize)]
struct JsonBuild {
    package: JsonPackage,
    binary_size: u64,
    linker_script: PathBuf,
    /// Executed tool command lines (verbose only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct JsonInspect {
    path: PathBuf,
    file_size: u64,
    checksum_ok: bool,
    header: JsonHeader,
    entries: Vec<JsonEntry>,
}

#[derive(Serialize)]
struct JsonVerify {
    path: PathBuf,
    valid: bool,
    problems: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    computed_sha256: Option<String>,
}

#[derive(Serialize)]
struct JsonExtract<'a> {
    dest: &'a Path,
    files: &'a [PathBuf],
}

#[derive(Serialize)]
struct JsonDeps<'a> {
    source: &'a Path,
    dependencies: &'a [ResolvedDependency],
    missing: usize,
}

impl OutputFormatter for JsonFormatter {
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let commands = if self.verbosity == Verbosity::Verbose {
            report
                .compile
                .steps
                .iter()
                .map(|s| s.command.clone())
                .collect()
        } else {
            Vec::new()
        };
        let output = JsonBuild {
            package: JsonPackage::from(&report.summary),
            binary_size: report.compile.size,
            linker_script: report.compile.linker_script.clone(),
            commands,
            warnings: report.warnings.clone(),
            started_at: report.started_at,
            finished_at: report.finished_at,
        };
        self.write_json(&output, writer)
    }

    fn format_package(
        &self,
        summary: &PackageSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(&JsonPackage::from(summary), writer)
    }

    fn format_inspect(
        &self,
        info: &PackageInfo<'_>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonInspect {
            path: info.path.to_path_buf(),
            file_size: info.file_size,
            checksum_ok: info.checksum_ok,
            header: JsonHeader::from(info.header),
            entries: info.entries.iter().map(JsonEntry::from).collect(),
        };
        self.write_json(&output, writer)
    }

    fn format_verify(&self, report: &VerifyReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonVerify {
            path: report.path.clone(),
            valid: report.is_valid(),
            problems: report.problems.iter().map(|p| p.to_string()).collect(),
            computed_sha256: report.computed_sha256.clone(),
        };
        self.write_json(&output, writer)
    }

    fn format_extract(
        &self,
        dest: &Path,
        files: &[PathBuf],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(&JsonExtract { dest, files }, writer)
    }

    fn format_deps(
        &self,
        source: &Path,
        deps: &[ResolvedDependency],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonDeps {
            source,
            dependencies: deps,
            missing: deps.iter().filter(|d| d.status.is_missing()).count(),
        };
        self.write_json(&output, writer)
    }

    fn format_deploy(
        &self,
        outcome: &DeployOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_json(outcome, writer)
    }

    fn format_init(&self, outcome: &InitOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        self.write_json(outcome, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::{Dependency, DependencyStatus};
    use crate::format::{ModuleFlags, ModuleType};
    use crate::package::VerifyProblem;

    fn to_value<F>(f: F) -> serde_json::Value
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_inspect_json() {
        let formatter = JsonFormatter::new(Verbosity::Normal);
        let header = PackageHeader {
            format_version: 1,
            name: "hello".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            entry_count: 1,
            entries_table_offset: 512,
            data_section_offset: 1024,
            data_section_size: 4,
            data_sha256: [0; 32],
            checksum: 0xbeef,
        };
        let entries = vec![ModuleEntry {
            name: "hello.bin".to_string(),
            offset: 0,
            size: 4,
            module_type: ModuleType::Application,
            flags: ModuleFlags::EXECUTABLE,
            signature: [0; 32],
        }];
        let info = PackageInfo {
            path: Path::new("hello.sdkk"),
            header: &header,
            entries: &entries,
            file_size: 1028,
            checksum_ok: true,
        };

        let json = to_value(|w| formatter.format_inspect(&info, w));
        assert_eq!(json["header"]["name"], "hello");
        assert_eq!(json["header"]["checksum"], "0x0000beef");
        assert_eq!(json["header"]["data_sha256"], "0".repeat(64));
        assert_eq!(json["entries"][0]["type"], "application");
        assert_eq!(json["entries"][0]["flags"][0], "executable");
        assert_eq!(json["entries"][0]["signed"], false);
        assert_eq!(json["checksum_ok"], true);
    }

    #[test]
    fn test_verify_json() {
        let formatter = JsonFormatter::new(Verbosity::Normal);
        let report = VerifyReport {
            path: PathBuf::from("x.sdkk"),
            problems: vec![VerifyProblem::DataOutOfBounds {
                end: 2048,
                file_size: 1024,
            }],
            computed_sha256: None,
        };
        let json = to_value(|w| formatter.format_verify(&report, w));
        assert_eq!(json["valid"], false);
        assert_eq!(json["problems"].as_array().unwrap().len(), 1);
        assert!(json.get("computed_sha256").is_none());
    }

    #[test]
    fn test_deps_json() {
        let formatter = JsonFormatter::new(Verbosity::Normal);
        let deps = vec![ResolvedDependency {
            dependency: Dependency::header("missing.h", false, 1),
            status: DependencyStatus::Missing,
        }];
        let json = to_value(|w| formatter.format_deps(Path::new("main.c"), &deps, w));
        assert_eq!(json["missing"], 1);
        assert_eq!(json["dependencies"][0]["name"], "missing.h");
        assert_eq!(json["dependencies"][0]["status"], "missing");
    }

    #[test]
    fn test_deploy_json() {
        let formatter = JsonFormatter::new(Verbosity::Normal);
        let outcome = DeployOutcome {
            command: "qemu".to_string(),
            installed_path: PathBuf::from("b/apps/a.sdkk"),
            pid: Some(7),
            dry_run: false,
        };
        let json = to_value(|w| formatter.format_deploy(&outcome, w));
        assert_eq!(json["pid"], 7);
        assert_eq!(json["dry_run"], false);
    }
}
