//! Starting the emulator process

use crate::error::DeployError;
use crate::toolchain::CommandSpec;
use std::process::Command;
use tracing::debug;

/// Trait for starting a detached emulator process
pub trait Launcher: Send + Sync {
    /// Spawn `command` without waiting for it; returns the process id
    fn launch(&self, command: &CommandSpec) -> Result<u32, DeployError>;
}

/// Launcher spawning real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, command: &CommandSpec) -> Result<u32, DeployError> {
        debug!(command = %command.display(), "spawning");
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }
        match cmd.spawn() {
            Ok(child) => Ok(child.id()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DeployError::QemuNotFound {
                program: command.program.display().to_string(),
            }),
            Err(source) => Err(DeployError::Launch { source }),
        }
    }
}
