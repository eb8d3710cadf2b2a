//! Deploying packages into QEMU
//!
//! This module provides:
//! - QEMU command line construction (`-kernel`, FAT-exposed build directory)
//! - Installing the package into the build directory
//! - A `Launcher` seam so tests never start a real emulator

mod launcher;

pub use launcher::{Launcher, SystemLauncher};

use crate::error::DeployError;
use crate::toolchain::CommandSpec;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Memory given to the guest when none is configured
pub const DEFAULT_MEMORY: &str = "256M";

/// Subdirectory of the build directory where applications are installed
pub const DEFAULT_APP_SUBDIR: &str = "apps";

/// QEMU executable name for this host
pub fn qemu_executable() -> &'static str {
    if cfg!(windows) {
        "qemu-system-x86_64.exe"
    } else {
        "qemu-system-x86_64"
    }
}

/// Everything needed to boot a package under QEMU
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub package: PathBuf,
    pub kernel: PathBuf,
    /// Host directory exposed to the guest as a FAT disk
    pub build_dir: PathBuf,
    pub app_subdir: String,
    pub memory: String,
    pub qemu: String,
    pub extra_args: Vec<String>,
}

impl DeployRequest {
    pub fn new(
        package: impl Into<PathBuf>,
        kernel: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package: package.into(),
            kernel: kernel.into(),
            build_dir: build_dir.into(),
            app_subdir: DEFAULT_APP_SUBDIR.to_string(),
            memory: DEFAULT_MEMORY.to_string(),
            qemu: qemu_executable().to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_app_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.app_subdir = subdir.into();
        self
    }

    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = memory.into();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Directory the package is copied into
    pub fn app_dir(&self) -> PathBuf {
        self.build_dir.join(&self.app_subdir)
    }

    /// Final location of the package inside the build directory
    pub fn installed_path(&self) -> PathBuf {
        let file_name = self
            .package
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("app.sdkk"));
        self.app_dir().join(file_name)
    }
}

/// What a deployment did
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub command: String,
    pub installed_path: PathBuf,
    /// Process id of the emulator; `None` for a dry run
    pub pid: Option<u32>,
    pub dry_run: bool,
}

/// Build the QEMU invocation for a request
pub fn build_qemu_command(request: &DeployRequest) -> CommandSpec {
    let mut command = CommandSpec::new(&request.qemu)
        .arg("-kernel")
        .path_arg(&request.kernel)
        .arg("-hda")
        .arg(format!("fat:rw:{}", request.build_dir.display()))
        .arg("-m")
        .arg(request.memory.as_str())
        .arg("-serial")
        .arg("stdio");
    for arg in &request.extra_args {
        command = command.arg(arg.as_str());
    }
    command
}

/// Check the inputs of a deployment
pub fn validate_request(request: &DeployRequest) -> Result<(), DeployError> {
    if !request.package.is_file() {
        return Err(DeployError::PackageNotFound {
            path: request.package.clone(),
        });
    }
    if !request.kernel.exists() {
        return Err(DeployError::KernelNotFound {
            path: request.kernel.clone(),
        });
    }
    if !request.build_dir.is_dir() {
        return Err(DeployError::InvalidBuildDir {
            path: request.build_dir.clone(),
        });
    }
    Ok(())
}

/// Install the package into the build directory and launch QEMU
///
/// A dry run validates the request and reports the command without touching the
/// build directory or starting anything.
pub fn deploy<L>(
    request: &DeployRequest,
    launcher: &L,
    dry_run: bool,
) -> Result<DeployOutcome, DeployError>
where
    L: Launcher + ?Sized,
{
    info!(package = %request.package.display(), "starting deployment");
    validate_request(request)?;

    let command = build_qemu_command(request);
    let installed_path = request.installed_path();

    if dry_run {
        info!(command = %command.display(), "dry run, not launching");
        return Ok(DeployOutcome {
            command: command.display(),
            installed_path,
            pid: None,
            dry_run: true,
        });
    }

    install_package(&request.package, &request.app_dir(), &installed_path)?;

    let pid = launcher.launch(&command)?;
    info!(pid, "QEMU launched");
    Ok(DeployOutcome {
        command: command.display(),
        installed_path,
        pid: Some(pid),
        dry_run: false,
    })
}

fn install_package(package: &Path, app_dir: &Path, dest: &Path) -> Result<(), DeployError> {
    debug!(dir = %app_dir.display(), "ensuring application directory");
    fs::create_dir_all(app_dir).map_err(|source| DeployError::CreateDir {
        path: app_dir.to_path_buf(),
        source,
    })?;

    info!(to = %dest.display(), "copying package");
    fs::copy(package, dest).map_err(|source| DeployError::Copy {
        from: package.to_path_buf(),
        to: dest.to_path_buf(),
        source,
    })?;
    Ok(())
}
