//! CLI argument parsing module for sdkk

use crate::config::{BuildOverrides, CONFIG_FILE_NAME, TOOLCHAIN_DIR_ENV};
use crate::toolchain::Arch;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build, inspect and deploy Doors SDKK packages
#[derive(Parser, Debug, Clone)]
#[command(name = "sdkk", version, about = "Build, inspect and deploy Doors SDKK packages")]
pub struct CliArgs {
    /// Project configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create sdkk.toml, linker.ld and src/main.c
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Package name (default: directory name)
        #[arg(long)]
        name: Option<String>,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Compile the project and pack it into an SDKK package
    Build {
        /// Target architecture
        #[arg(long, value_enum)]
        arch: Option<Arch>,

        /// Directory containing the MinGW tools
        #[arg(long, env = TOOLCHAIN_DIR_ENV)]
        toolchain_dir: Option<PathBuf>,

        /// Output package path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Linker script (created with default content when missing)
        #[arg(long)]
        linker_script: Option<PathBuf>,
    },

    /// Pack existing files into an SDKK package
    Pack {
        /// Package name
        #[arg(long)]
        name: String,

        /// Package version
        #[arg(long = "version", value_name = "VERSION")]
        pkg_version: String,

        /// Package description
        #[arg(long, default_value = "")]
        description: String,

        /// Internal path of the entry module (default: first file)
        #[arg(long)]
        entry: Option<String>,

        /// Output package path (default: <name>.sdkk)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Files to pack, as HOST or HOST=INTERNAL
        #[arg(required = true, value_name = "FILE[=INTERNAL]")]
        files: Vec<String>,
    },

    /// Show the header and module table of a package
    Inspect {
        package: PathBuf,
    },

    /// Check checksum, bounds and SHA-256 of a package
    Verify {
        package: PathBuf,
    },

    /// Extract every module of a package
    Extract {
        package: PathBuf,
        dest: PathBuf,
    },

    /// List #include and DRO_MODULE dependencies of a source file
    Deps {
        /// Source file (default: build.source from sdkk.toml)
        source: Option<PathBuf>,

        /// Additional include directory
        #[arg(short = 'I', long = "include", value_name = "DIR")]
        include_dirs: Vec<PathBuf>,
    },

    /// Print a C source file with syntax highlighting
    Highlight {
        file: PathBuf,

        /// Print the spans instead of the highlighted text
        #[arg(long)]
        spans: bool,
    },

    /// Copy a package into the QEMU build directory and boot the kernel
    Deploy {
        /// Package to deploy (default: build.output from sdkk.toml)
        package: Option<PathBuf>,

        /// Kernel ELF image
        #[arg(long)]
        kernel: Option<PathBuf>,

        /// Directory exposed to the guest as a FAT disk
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Subdirectory of the build directory for applications
        #[arg(long)]
        app_subdir: Option<String>,

        /// Guest memory size
        #[arg(long)]
        memory: Option<String>,

        /// QEMU executable
        #[arg(long)]
        qemu: Option<String>,

        /// Show the QEMU command without copying or launching
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Extra arguments passed to QEMU
        #[arg(last = true)]
        qemu_args: Vec<String>,
    },
}

impl CliArgs {
    /// Whether a progress spinner may be drawn
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Default log filter directive for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

impl Command {
    /// Build overrides given on the command line, if this is `build`
    pub fn build_overrides(&self) -> Option<BuildOverrides> {
        match self {
            Command::Build {
                arch,
                toolchain_dir,
                output,
                linker_script,
            } => Some(BuildOverrides {
                arch: *arch,
                toolchain_dir: toolchain_dir.clone(),
                output: output.clone(),
                linker_script: linker_script.clone(),
            }),
            _ => None,
        }
    }
}
