//! Resolving scanned dependencies on the host

use super::{Dependency, DependencyKind};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolution result for one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "path", rename_all = "lowercase")]
pub enum DependencyStatus {
    /// Header located on disk
    Found(PathBuf),
    /// Quoted header not found anywhere
    Missing,
    /// Angle-bracket header assumed to come with the toolchain
    System,
    /// Runtime module; only the target system can resolve it
    Unresolved,
}

impl DependencyStatus {
    pub fn is_missing(&self) -> bool {
        matches!(self, DependencyStatus::Missing)
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyStatus::Found(path) => write!(f, "found at {}", path.display()),
            DependencyStatus::Missing => f.write_str("missing"),
            DependencyStatus::System => f.write_str("system"),
            DependencyStatus::Unresolved => f.write_str("runtime module"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDependency {
    #[serde(flatten)]
    pub dependency: Dependency,
    #[serde(flatten)]
    pub status: DependencyStatus,
}

/// Resolve dependencies against the source directory and include directories
///
/// Quoted headers are looked up in `source_dir` first, then in `include_dirs`;
/// angle-bracket headers only in `include_dirs`.
pub fn validate(
    deps: &[Dependency],
    source_dir: &Path,
    include_dirs: &[PathBuf],
) -> Vec<ResolvedDependency> {
    deps.iter()
        .map(|dep| {
            let status = match dep.kind {
                DependencyKind::Module => DependencyStatus::Unresolved,
                DependencyKind::Header { system } => {
                    let quoted_dirs = if system { None } else { Some(source_dir) };
                    let found = quoted_dirs
                        .into_iter()
                        .chain(include_dirs.iter().map(PathBuf::as_path))
                        .map(|dir| dir.join(&dep.name))
                        .find(|candidate| candidate.is_file());
                    match found {
                        Some(path) => DependencyStatus::Found(path),
                        None if system => DependencyStatus::System,
                        None => DependencyStatus::Missing,
                    }
                }
            };
            debug!(name = %dep.name, %status, "resolved dependency");
            ResolvedDependency {
                dependency: dep.clone(),
                status,
            }
        })
        .collect()
}
