//! Running external tools

use crate::error::ToolchainError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Time allowed for a single tool invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-like rendering for logs and error messages
    pub fn display(&self) -> String {
        let quote = |s: &str| {
            if s.is_empty() || s.contains(char::is_whitespace) {
                format!("\"{}\"", s)
            } else {
                s.to_string()
            }
        };
        std::iter::once(quote(&self.program.to_string_lossy()))
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    pub success: bool,
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout and stderr in one block, for failure reports
    pub fn combined(&self) -> String {
        let section = |s: &str, empty: &str| {
            let s = s.trim();
            if s.is_empty() {
                empty.to_string()
            } else {
                s.to_string()
            }
        };
        format!(
            "Stdout:\n{}\nStderr:\n{}",
            section(&self.stdout, "EMPTY STDOUT"),
            section(&self.stderr, "EMPTY STDERR")
        )
    }
}

/// Trait for running toolchain commands
///
/// A non-zero exit status is reported through `CommandOutput::success`; errors are
/// reserved for commands that could not run to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ToolchainError>;
}

/// Runner executing real processes
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ToolchainError> {
        let rendered = command.display();
        debug!(command = %rendered, "executing");

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args).kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(ToolchainError::Timeout {
                    command: rendered,
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolchainError::ExecutableNotFound {
                    program: command.program.display().to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(ToolchainError::Spawn {
                    command: rendered,
                    source: e,
                })
            }
            Ok(Ok(output)) => output,
        };

        debug!(command = %rendered, status = ?output.status.code(), "finished");
        Ok(CommandOutput {
            command: rendered,
            success: output.status.success(),
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
