//! Cross-compilation toolchain integration
//!
//! This module provides:
//! - Target architecture definitions and MinGW tool naming
//! - Discovery of the compiler, linker and objcopy in a toolchain directory
//! - A command runner seam over `tokio::process`
//! - The compile → link → objcopy pipeline producing a raw binary

mod arch;
mod compile;
mod discovery;
mod runner;

pub use arch::{Arch, Tool};
pub use compile::{
    compile_to_raw_binary, BuildStep, CompileOptions, CompileOutcome, DEFAULT_LINKER_SCRIPT,
};
pub use discovery::{discover_tools, tool_candidates, ToolPaths};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner, DEFAULT_TIMEOUT};

use std::path::PathBuf;

/// Default location of the MinGW binaries for this host
pub fn default_toolchain_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:/msys64/mingw64/bin")
    } else {
        PathBuf::from("/usr/bin")
    }
}

/// Default entry point symbol
pub const DEFAULT_ENTRY: &str = "_start";
