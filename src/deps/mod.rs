//! Source dependency scanning
//!
//! This module provides:
//! - `scan`: find `#include` directives and `DRO_MODULE("...")` references in C source
//! - `validate`: resolve headers against the source and include directories

mod scanner;
mod validator;

pub use scanner::{scan, strip_comments};
pub use validator::{validate, DependencyStatus, ResolvedDependency};

use serde::Serialize;
use std::fmt;

/// Kind of a dependency reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DependencyKind {
    /// `#include`; `system` is set for the angle-bracket form
    Header { system: bool },
    /// Doors runtime module named by `DRO_MODULE`
    Module,
}

/// A dependency found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    #[serde(flatten)]
    pub kind: DependencyKind,
    pub name: String,
    /// 1-based source line
    pub line: usize,
}

impl Dependency {
    pub fn header(name: impl Into<String>, system: bool, line: usize) -> Self {
        Self {
            kind: DependencyKind::Header { system },
            name: name.into(),
            line,
        }
    }

    pub fn module(name: impl Into<String>, line: usize) -> Self {
        Self {
            kind: DependencyKind::Module,
            name: name.into(),
            line,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self.kind, DependencyKind::Header { .. })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DependencyKind::Header { system: true } => write!(f, "Header: <{}>", self.name),
            DependencyKind::Header { system: false } => write!(f, "Header: \"{}\"", self.name),
            DependencyKind::Module => write!(f, "Module: {}", self.name),
        }
    }
}
