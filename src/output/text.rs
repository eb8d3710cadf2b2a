//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Package header and module table display
//! - Verification results with every problem listed
//! - Dependency listings with resolution status
//! - Build and deploy summaries

use crate::config::InitOutcome;
use crate::deploy::DeployOutcome;
use crate::deps::{DependencyStatus, ResolvedDependency};
use crate::format::{to_hex, ModuleEntry};
use crate::orchestrator::BuildReport;
use crate::output::{OutputFormatter, PackageInfo, Verbosity};
use crate::package::{PackageSummary, VerifyReport};
use colored::{ColoredString, Colorize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn ok(&self, text: &str) -> String {
        self.paint(text, |s| s.green().bold())
    }

    fn bad(&self, text: &str) -> String {
        self.paint(text, |s| s.red().bold())
    }

    fn caution(&self, text: &str) -> String {
        self.paint(text, |s| s.yellow())
    }

    fn dim(&self, text: &str) -> String {
        self.paint(text, |s| s.dimmed())
    }

    fn write_warnings(&self, warnings: &[String], writer: &mut dyn Write) -> std::io::Result<()> {
        for warning in warnings {
            writeln!(writer, "{} {}", self.caution("warning:"), warning)?;
        }
        Ok(())
    }

    fn write_entries(&self, entries: &[ModuleEntry], writer: &mut dyn Write) -> std::io::Result<()> {
        let name_width = entries
            .iter()
            .map(|e| e.name.len())
            .max()
            .unwrap_or(0)
            .max(4);
        writeln!(
            writer,
            "  {:<name_width$}  {:<11}  {:<20}  {:>10}  {:>10}",
            "NAME",
            "TYPE",
            "FLAGS",
            "OFFSET",
            "SIZE",
            name_width = name_width
        )?;
        for entry in entries {
            writeln!(
                writer,
                "  {:<name_width$}  {:<11}  {:<20}  {:>10}  {:>10}",
                entry.name,
                entry.module_type.label(),
                entry.flags.to_string(),
                entry.offset,
                entry.size,
                name_width = name_width
            )?;
        }
        Ok(())
    }

    fn write_summary(&self, summary: &PackageSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let header = &summary.header;
        writeln!(
            writer,
            "{} {} ({} modules, {} bytes)",
            self.ok("Created"),
            summary.path.display(),
            summary.entries.len(),
            summary.total_size
        )?;
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        writeln!(writer, "  Package: {} {}", header.name, header.version)?;
        writeln!(writer, "  SHA-256: {}", to_hex(&header.data_sha256))?;
        if self.verbosity == Verbosity::Verbose {
            writeln!(
                writer,
                "  Data section: {} bytes at offset {}",
                header.data_section_size, header.data_section_offset
            )?;
            writeln!(writer, "  Header checksum: {:#010x}", header.checksum)?;
            self.write_entries(&summary.entries, writer)?;
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()> {
        self.write_warnings(&report.warnings, writer)?;
        if self.verbosity == Verbosity::Verbose {
            for step in &report.compile.steps {
                writeln!(writer, "{} {}", self.dim("$"), step.command)?;
            }
            writeln!(
                writer,
                "Compiled {} bytes using {}",
                report.compile.size,
                report.compile.linker_script.display()
            )?;
        }
        self.write_summary(&report.summary, writer)?;
        if self.verbosity != Verbosity::Quiet {
            writeln!(
                writer,
                "{}",
                self.dim(&format!(
                    "Finished at {} in {} ms",
                    report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    report.duration().num_milliseconds()
                ))
            )?;
        }
        Ok(())
    }

    fn format_package(
        &self,
        summary: &PackageSummary,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        self.write_warnings(&summary.warnings, writer)?;
        self.write_summary(summary, writer)
    }

    fn format_inspect(
        &self,
        info: &PackageInfo<'_>,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let header = info.header;
        writeln!(
            writer,
            "{} {} {}",
            self.paint("Package", |s| s.bold()),
            header.name,
            header.version
        )?;
        if !header.description.is_empty() {
            writeln!(writer, "  Description: {}", header.description)?;
        }
        writeln!(writer, "  File: {} ({} bytes)", info.path.display(), info.file_size)?;
        writeln!(writer, "  Format version: {}", header.format_version)?;
        writeln!(
            writer,
            "  Entries: {} (table at offset {})",
            header.entry_count, header.entries_table_offset
        )?;
        writeln!(
            writer,
            "  Data section: {} bytes at offset {}",
            header.data_section_size, header.data_section_offset
        )?;
        writeln!(writer, "  SHA-256: {}", to_hex(&header.data_sha256))?;
        let checksum_state = if info.checksum_ok {
            self.ok("ok")
        } else {
            self.bad("MISMATCH")
        };
        writeln!(
            writer,
            "  Header checksum: {:#010x} ({})",
            header.checksum, checksum_state
        )?;
        writeln!(writer)?;
        self.write_entries(info.entries, writer)
    }

    fn format_verify(&self, report: &VerifyReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if report.is_valid() {
            writeln!(writer, "{} {}", self.ok("OK"), report.path.display())?;
            if self.verbosity == Verbosity::Verbose {
                if let Some(ref sha) = report.computed_sha256 {
                    writeln!(writer, "  SHA-256: {}", sha)?;
                }
            }
            return Ok(());
        }

        writeln!(
            writer,
            "{} {} ({} problem{})",
            self.bad("FAILED"),
            report.path.display(),
            report.problems.len(),
            if report.problems.len() == 1 { "" } else { "s" }
        )?;
        for problem in &report.problems {
            writeln!(writer, "  - {}", problem)?;
        }
        Ok(())
    }

    fn format_extract(
        &self,
        dest: &Path,
        files: &[PathBuf],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        writeln!(
            writer,
            "{} {} module{} to {}",
            self.ok("Extracted"),
            files.len(),
            if files.len() == 1 { "" } else { "s" },
            dest.display()
        )?;
        if self.verbosity != Verbosity::Quiet {
            for file in files {
                writeln!(writer, "  {}", file.display())?;
            }
        }
        Ok(())
    }

    fn format_deps(
        &self,
        source: &Path,
        deps: &[ResolvedDependency],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            writeln!(
                writer,
                "{} {}",
                self.paint("Dependencies of", |s| s.bold()),
                source.display()
            )?;
        }
        if deps.is_empty() {
            writeln!(writer, "  No dependencies found.")?;
            return Ok(());
        }
        for resolved in deps {
            let status = match &resolved.status {
                DependencyStatus::Found(_) => self.ok(&resolved.status.to_string()),
                DependencyStatus::Missing => self.bad("missing"),
                DependencyStatus::System | DependencyStatus::Unresolved => {
                    self.dim(&resolved.status.to_string())
                }
            };
            writeln!(
                writer,
                "  {:>4}: {}  [{}]",
                resolved.dependency.line, resolved.dependency, status
            )?;
        }
        let missing = deps.iter().filter(|d| d.status.is_missing()).count();
        if missing > 0 {
            writeln!(
                writer,
                "{} {} header{} not found",
                self.caution("warning:"),
                missing,
                if missing == 1 { "" } else { "s" }
            )?;
        }
        Ok(())
    }

    fn format_deploy(
        &self,
        outcome: &DeployOutcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if outcome.dry_run {
            writeln!(writer, "{} {}", self.paint("(dry-run)", |s| s.cyan()), outcome.command)?;
            writeln!(
                writer,
                "  would install to {}",
                outcome.installed_path.display()
            )?;
            return Ok(());
        }
        writeln!(
            writer,
            "{} {}",
            self.ok("Installed"),
            outcome.installed_path.display()
        )?;
        if let Some(pid) = outcome.pid {
            writeln!(writer, "{} QEMU (pid {})", self.ok("Launched"), pid)?;
        }
        if self.verbosity == Verbosity::Verbose {
            writeln!(writer, "  {}", outcome.command)?;
        }
        Ok(())
    }

    fn format_init(&self, outcome: &InitOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            writer,
            "{} project '{}' in {}",
            self.ok("Created"),
            outcome.name,
            outcome.root.display()
        )?;
        if self.verbosity != Verbosity::Quiet {
            for path in &outcome.created {
                writeln!(writer, "  {}", path.display())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Dependency;
    use crate::format::{ModuleFlags, ModuleType, PackageHeader};
    use crate::package::VerifyProblem;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn entry(name: &str, offset: u64, size: u64) -> ModuleEntry {
        ModuleEntry {
            name: name.to_string(),
            offset,
            size,
            module_type: ModuleType::Data,
            flags: ModuleFlags::READONLY,
            signature: [0; 32],
        }
    }

    #[test]
    fn test_verify_lists_every_problem() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let report = VerifyReport {
            path: PathBuf::from("bad.sdkk"),
            problems: vec![
                VerifyProblem::ChecksumMismatch {
                    stored: 1,
                    computed: 2,
                },
                VerifyProblem::HashMismatch {
                    expected: "aa".to_string(),
                    actual: "bb".to_string(),
                },
            ],
            computed_sha256: Some("bb".to_string()),
        };
        let out = render(|w| formatter.format_verify(&report, w));
        assert!(out.starts_with("FAILED bad.sdkk (2 problems)"));
        assert!(out.contains("header checksum mismatch"));
        assert!(out.contains("expected aa, got bb"));
    }

    #[test]
    fn test_verify_ok() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let report = VerifyReport {
            path: PathBuf::from("good.sdkk"),
            problems: vec![],
            computed_sha256: None,
        };
        assert_eq!(
            render(|w| formatter.format_verify(&report, w)),
            "OK good.sdkk\n"
        );
    }

    #[test]
    fn test_inspect_shows_modules() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let header = PackageHeader {
            format_version: 1,
            name: "hello".to_string(),
            version: "1.0.0".to_string(),
            description: "demo".to_string(),
            entry_count: 1,
            entries_table_offset: 512,
            data_section_offset: 1024,
            data_section_size: 3,
            data_sha256: [0xab; 32],
            checksum: 0x1234,
        };
        let entries = vec![entry("res/logo.bmp", 0, 3)];
        let info = PackageInfo {
            path: Path::new("hello.sdkk"),
            header: &header,
            entries: &entries,
            file_size: 1027,
            checksum_ok: false,
        };
        let out = render(|w| formatter.format_inspect(&info, w));
        assert!(out.contains("Package hello 1.0.0"));
        assert!(out.contains("Description: demo"));
        assert!(out.contains("(MISMATCH)"));
        assert!(out.contains("res/logo.bmp"));
        assert!(out.contains("readonly"));
    }

    #[test]
    fn test_deps_output() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let deps = vec![
            ResolvedDependency {
                dependency: Dependency::header("app.h", false, 2),
                status: DependencyStatus::Missing,
            },
            ResolvedDependency {
                dependency: Dependency::module("gfx", 5),
                status: DependencyStatus::Unresolved,
            },
        ];
        let out = render(|w| formatter.format_deps(Path::new("main.c"), &deps, w));
        assert!(out.contains("Header: \"app.h\"  [missing]"));
        assert!(out.contains("Module: gfx  [runtime module]"));
        assert!(out.contains("1 header not found"));
    }

    #[test]
    fn test_deps_empty() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, false);
        let out = render(|w| formatter.format_deps(Path::new("main.c"), &[], w));
        assert_eq!(out, "  No dependencies found.\n");
    }

    #[test]
    fn test_deploy_dry_run() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let outcome = DeployOutcome {
            command: "qemu-system-x86_64 -kernel k".to_string(),
            installed_path: PathBuf::from("build/apps/a.sdkk"),
            pid: None,
            dry_run: true,
        };
        let out = render(|w| formatter.format_deploy(&outcome, w));
        assert!(out.starts_with("(dry-run) qemu-system-x86_64 -kernel k"));
        assert!(out.contains("would install to build/apps/a.sdkk"));
    }
}
