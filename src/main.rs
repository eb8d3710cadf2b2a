//! sdkk - Doors SDKK package toolkit
//!
//! Builds C sources into flat binaries with a MinGW cross toolchain, packs them into
//! `.sdkk` packages, inspects and verifies packages, scans source dependencies,
//! highlights C code and boots packages under QEMU.

use clap::Parser;
use sdkk::cli::{CliArgs, Command};
use sdkk::config::{init_project, ProjectConfig};
use sdkk::deploy::{deploy, SystemLauncher};
use sdkk::deps::{scan, validate};
use sdkk::error::{
    AppError, ConfigError, DeployError, FormatError, IoError, PackageError, ToolchainError,
};
use sdkk::format::StatusCode;
use sdkk::highlight::{highlight, position, render, Palette};
use sdkk::orchestrator::Orchestrator;
use sdkk::output::{create_formatter, OutputConfig, PackageInfo};
use sdkk::package::{build_package, PackageFile, PackageReader, PackageSpec};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(&args);

    if args.no_color {
        colored::control::set_override(false);
    }

    match run(args).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(status_of(&e).code())
        }
    }
}

fn init_logging(args: &CliArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sdkk={}", args.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// SDK status code for an error bubbled up to the binary edge
fn status_of(err: &anyhow::Error) -> StatusCode {
    if let Some(e) = err.downcast_ref::<AppError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<PackageError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<ToolchainError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<DeployError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<IoError>() {
        e.status_code()
    } else if err.downcast_ref::<FormatError>().is_some() {
        StatusCode::InvalidFormat
    } else {
        StatusCode::Generic
    }
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitCode> {
    debug!(version = env!("CARGO_PKG_VERSION"), command = ?args.command, "sdkk starting");

    let output_config =
        OutputConfig::from_cli(args.json, args.verbose, args.quiet).with_color(!args.no_color);
    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();

    let status = match &args.command {
        Command::Init { dir, name, force } => {
            let outcome = init_project(dir, name.as_deref(), *force)?;
            formatter.format_init(&outcome, &mut stdout)?;
            StatusCode::Ok
        }

        Command::Build { .. } => {
            let mut config = ProjectConfig::load(&args.config)?;
            if let Some(overrides) = args.command.build_overrides() {
                config.apply_overrides(overrides);
            }
            let report = Orchestrator::new(config).run(args.show_progress()).await?;
            formatter.format_build(&report, &mut stdout)?;
            StatusCode::Ok
        }

        Command::Pack {
            name,
            pkg_version,
            description,
            entry,
            output,
            files,
        } => {
            let mut spec = PackageSpec::new(name, pkg_version).with_description(description);
            spec.files = files.iter().map(|f| PackageFile::from_arg(f)).collect();
            spec.entry = entry.clone();
            let output = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.sdkk", name)));
            let summary = build_package(&spec, &output)?;
            formatter.format_package(&summary, &mut stdout)?;
            StatusCode::Ok
        }

        Command::Inspect { package } => {
            let reader = PackageReader::open(package)?;
            formatter.format_inspect(&PackageInfo::from_reader(&reader), &mut stdout)?;
            StatusCode::Ok
        }

        Command::Verify { package } => {
            let mut reader = PackageReader::open(package)?;
            let report = reader.verify()?;
            formatter.format_verify(&report, &mut stdout)?;
            if report.is_valid() {
                StatusCode::Ok
            } else {
                StatusCode::InvalidFormat
            }
        }

        Command::Extract { package, dest } => {
            let mut reader = PackageReader::open(package)?;
            reader.require_valid_header()?;
            let files = reader.extract(dest)?;
            formatter.format_extract(dest, &files, &mut stdout)?;
            StatusCode::Ok
        }

        Command::Deps {
            source,
            include_dirs,
        } => {
            let config = load_optional_config(&args.config)?;
            let source = match (source, &config) {
                (Some(source), _) => source.clone(),
                (None, Some(config)) => config.build.source.clone(),
                (None, None) => {
                    return Err(ConfigError::NotFound {
                        path: args.config.clone(),
                    }
                    .into())
                }
            };
            let mut dirs = include_dirs.clone();
            if let Some(config) = &config {
                dirs.extend(config.build.include_dirs.iter().cloned());
            }

            let text = read_source(&source)?;
            let source_dir = source
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let resolved = validate(&scan(&text), source_dir, &dirs);
            formatter.format_deps(&source, &resolved, &mut stdout)?;
            StatusCode::Ok
        }

        Command::Highlight { file, spans } => {
            let text = read_source(file)?;
            let found = highlight(&text);
            if *spans || args.json {
                write_spans(&text, &found, args.json, &mut stdout)?;
            } else {
                let rendered = render(&text, &found, &Palette::default(), !args.no_color);
                stdout.write_all(rendered.as_bytes())?;
            }
            StatusCode::Ok
        }

        Command::Deploy {
            package,
            kernel,
            build_dir,
            app_subdir,
            memory,
            qemu,
            dry_run,
            qemu_args,
        } => {
            let config = load_optional_config(&args.config)?;
            let package = match (package, &config) {
                (Some(p), _) => p.clone(),
                (None, Some(config)) => config.build.output.clone(),
                (None, None) => {
                    return Err(ConfigError::MissingField { field: "package" }.into())
                }
            };

            let settings = config.map(|c| c.deploy).unwrap_or_default();
            let mut request = settings.request(package, kernel.clone(), build_dir.clone())?;
            if let Some(s) = app_subdir {
                request.app_subdir = s.clone();
            }
            if let Some(m) = memory {
                request.memory = m.clone();
            }
            if let Some(q) = qemu {
                request.qemu = q.clone();
            }
            request.extra_args.extend(qemu_args.iter().cloned());

            let outcome = deploy(&request, &SystemLauncher, *dry_run)?;
            formatter.format_deploy(&outcome, &mut stdout)?;
            StatusCode::Ok
        }
    };

    stdout.flush()?;
    Ok(ExitCode::from(status.code()))
}

fn load_optional_config(path: &Path) -> Result<Option<ProjectConfig>, ConfigError> {
    if path.is_file() {
        ProjectConfig::load(path).map(Some)
    } else {
        Ok(None)
    }
}

fn read_source(path: &Path) -> Result<String, IoError> {
    let bytes = fs::read(path).map_err(|e| IoError::from_io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Serialize)]
struct SpanRow<'a> {
    kind: &'static str,
    start: usize,
    end: usize,
    line: usize,
    column: usize,
    text: &'a str,
}

fn write_spans(
    text: &str,
    spans: &[sdkk::highlight::Span],
    json: bool,
    writer: &mut dyn Write,
) -> anyhow::Result<()> {
    let rows: Vec<SpanRow<'_>> = spans
        .iter()
        .map(|span| {
            let (line, column) = position(text, span.start);
            SpanRow {
                kind: span.kind.name(),
                start: span.start,
                end: span.end,
                line,
                column,
                text: span.text(text),
            }
        })
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
    } else {
        for row in rows {
            writeln!(
                writer,
                "{}:{}\t{}\t{:?}",
                row.line, row.column, row.kind, row.text
            )?;
        }
    }
    Ok(())
}
