//! Compile → link → objcopy pipeline producing a raw flat binary

use super::{discover_tools, Arch, CommandOutput, CommandRunner, CommandSpec, DEFAULT_ENTRY};
use crate::error::ToolchainError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Linker script written when the project does not provide one
pub const DEFAULT_LINKER_SCRIPT: &str = r#"/* Default linker script for Doors SDKK applications */

ENTRY(_start)

SECTIONS
{
    . = 0x100000; /* Link address */

    .text :
    {
        *(.text)
        *(.text.*)
    }

    .rodata :
    {
        *(.rodata)
        *(.rodata.*)
    }

    .data :
    {
        *(.data)
        *(.data.*)
    }

    .bss :
    {
        *(.bss)
        *(.bss.*)
        *(COMMON)
    }

    /DISCARD/ :
    {
        *(.eh_frame)
        *(.comment)
        *(.note.gnu.build-id)
        *(.rela.*)
        *(.dynsym)
        *(.dynstr)
        *(.dynamic)
        *(.got)
        *(.got.plt)
        *(.plt)
        *(.debug*)
        *(.stab*)
        *(.iplt)
        *(.igot)
    }
}
"#;

/// Stages of the raw binary pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Compile,
    Link,
    Objcopy,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStep::Compile => "Compilation",
            BuildStep::Link => "Linking",
            BuildStep::Objcopy => "Objcopy",
        })
    }
}

/// Options for `compile_to_raw_binary`
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub arch: Arch,
    /// Entry point symbol
    pub entry: String,
    /// Directory holding the MinGW executables
    pub toolchain_dir: PathBuf,
    /// Linker script; a default one is generated when `None`
    pub linker_script: Option<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            arch: Arch::default(),
            entry: DEFAULT_ENTRY.to_string(),
            toolchain_dir: super::default_toolchain_dir(),
            linker_script: None,
            include_dirs: Vec::new(),
        }
    }
}

/// Result of a successful compilation
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub output: PathBuf,
    pub size: u64,
    /// Script used for linking; it may live in a directory that no longer exists
    pub linker_script: PathBuf,
    pub steps: Vec<CommandOutput>,
}

/// Compile `source` into the flat binary `output`
///
/// Intermediate objects live in a temporary directory beside `output`, removed on
/// every exit path.
pub async fn compile_to_raw_binary<R>(
    source: &Path,
    output: &Path,
    options: &CompileOptions,
    runner: &R,
) -> Result<CompileOutcome, ToolchainError>
where
    R: CommandRunner + ?Sized,
{
    info!(source = %source.display(), arch = %options.arch, "compiling to raw binary");

    if !source.is_file() {
        return Err(ToolchainError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }

    // The tools run inside the scratch directory, so every path handed to them must
    // be absolute.
    let source = absolute(source)?;
    let output_path = absolute(output)?;
    let output = output_path.as_path();
    let toolchain_dir = absolute(&options.toolchain_dir)?;
    let include_dirs = options
        .include_dirs
        .iter()
        .map(|dir| absolute(dir))
        .collect::<Result<Vec<_>, _>>()?;
    let configured_script = options
        .linker_script
        .as_deref()
        .map(absolute)
        .transpose()?;

    let tools = discover_tools(&toolchain_dir, options.arch)?;

    let output_dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&output_dir).map_err(|e| ToolchainError::io(&output_dir, e))?;
    let temp_dir = tempfile::Builder::new()
        .prefix("sdkk-build-")
        .tempdir_in(&output_dir)
        .map_err(|e| ToolchainError::io(&output_dir, e))?;
    debug!(dir = %temp_dir.path().display(), "created temporary build directory");

    let linker_script = prepare_linker_script(configured_script.as_deref(), temp_dir.path())?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    let object = temp_dir.path().join(format!("{}.o", stem));
    let elf = temp_dir.path().join(format!("{}.elf", stem));

    let mut steps = Vec::new();

    let mut compile = CommandSpec::new(&tools.cc)
        .arg(options.arch.compiler_mode_flag())
        .arg("-ffreestanding")
        .arg("-fno-pie")
        .arg("-nostdlib")
        .arg("-Wall")
        .arg("-Wextra");
    for dir in &include_dirs {
        compile = compile.arg("-I").path_arg(dir);
    }
    let compile = compile
        .arg("-c")
        .path_arg(&source)
        .arg("-o")
        .path_arg(&object)
        .current_dir(temp_dir.path());
    run_step(runner, BuildStep::Compile, &compile, &mut steps).await?;

    let link = CommandSpec::new(&tools.ld)
        .arg("-T")
        .path_arg(&linker_script)
        .arg("-m")
        .arg(options.arch.linker_emulation())
        .arg("-e")
        .arg(options.entry.as_str())
        .arg("-o")
        .path_arg(&elf)
        .path_arg(&object)
        .current_dir(temp_dir.path());
    run_step(runner, BuildStep::Link, &link, &mut steps).await?;

    let objcopy = CommandSpec::new(&tools.objcopy)
        .arg("-O")
        .arg("binary")
        .path_arg(&elf)
        .path_arg(output)
        .current_dir(temp_dir.path());
    run_step(runner, BuildStep::Objcopy, &objcopy, &mut steps).await?;

    let size = fs::metadata(output)
        .map_err(|_| ToolchainError::MissingOutput {
            path: output.to_path_buf(),
        })?
        .len();

    info!(output = %output.display(), size, "raw binary created");
    Ok(CompileOutcome {
        output: output.to_path_buf(),
        size,
        linker_script,
        steps,
    })
}

async fn run_step<R>(
    runner: &R,
    step: BuildStep,
    command: &CommandSpec,
    log: &mut Vec<CommandOutput>,
) -> Result<(), ToolchainError>
where
    R: CommandRunner + ?Sized,
{
    info!(%step, "running");
    let output = runner.run(command).await?;
    let success = output.success;
    let detail = output.combined();
    log.push(output);
    if !success {
        return Err(ToolchainError::StepFailed {
            step,
            output: detail,
        });
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, ToolchainError> {
    std::path::absolute(path).map_err(|e| ToolchainError::io(path, e))
}

/// Resolve the linker script, writing the default one where needed
fn prepare_linker_script(
    configured: Option<&Path>,
    temp_dir: &Path,
) -> Result<PathBuf, ToolchainError> {
    let path = match configured {
        Some(path) if path.exists() => {
            debug!(script = %path.display(), "using linker script");
            return Ok(path.to_path_buf());
        }
        Some(path) => path.to_path_buf(),
        None => temp_dir.join("linker.ld"),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ToolchainError::io(parent, e))?;
        }
    }
    fs::write(&path, DEFAULT_LINKER_SCRIPT).map_err(|e| ToolchainError::io(&path, e))?;
    info!(script = %path.display(), "wrote default linker script");
    Ok(path)
}
