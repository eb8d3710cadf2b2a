//! Locating the toolchain executables

use super::{Arch, Tool};
use crate::error::ToolchainError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved paths of the tools the build pipeline needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub cc: PathBuf,
    pub ld: PathBuf,
    pub objcopy: PathBuf,
}

/// Names tried for a tool, in order of preference
///
/// The prefixed name comes first; the bare name covers hosts whose tools are not
/// prefixed. On Windows the `.exe` variants are tried as well.
pub fn tool_candidates(tool: Tool, arch: Arch) -> Vec<String> {
    let mut names = vec![arch.prefixed(tool), tool.executable().to_string()];
    if cfg!(windows) {
        let with_exe: Vec<String> = names.iter().map(|n| format!("{}.exe", n)).collect();
        names.extend(with_exe);
    }
    names
}

/// Find the compiler, linker and objcopy for `arch` in `bin_dir`
pub fn discover_tools(bin_dir: &Path, arch: Arch) -> Result<ToolPaths, ToolchainError> {
    debug!(dir = %bin_dir.display(), %arch, "searching for tools");

    if !bin_dir.is_dir() {
        return Err(ToolchainError::InvalidToolchainDir {
            path: bin_dir.to_path_buf(),
        });
    }

    let find = |tool: Tool| -> Result<PathBuf, ToolchainError> {
        let candidates = tool_candidates(tool, arch);
        let found = candidates
            .iter()
            .map(|name| bin_dir.join(name))
            .find(|path| path.is_file());
        match found {
            Some(path) => {
                debug!(tool = tool.key(), path = %path.display(), "found tool");
                Ok(path)
            }
            None => Err(ToolchainError::ToolNotFound {
                tool: tool.key(),
                dir: bin_dir.to_path_buf(),
                candidates,
            }),
        }
    };

    Ok(ToolPaths {
        cc: find(Tool::Cc)?,
        ld: find(Tool::Ld)?,
        objcopy: find(Tool::Objcopy)?,
    })
}
