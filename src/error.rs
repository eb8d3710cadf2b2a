//! Application error types using thiserror
//!
//! Error hierarchy:
//! - FormatError: Malformed header or entry bytes
//! - PackageError: Building, reading or extracting packages
//! - ToolchainError: Cross-compiler discovery and invocation
//! - ConfigError: sdkk.toml and CLI configuration
//! - DeployError: Copying packages and launching QEMU
//! - IoError: Plain file system failures
//!
//! Every error maps onto an SDK `StatusCode`, which the CLI uses as exit status.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

use crate::format::StatusCode;
use crate::toolchain::BuildStep;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Errors in the binary layout of a package
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("invalid {what} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("bad magic {found:?}: not an SDKK package")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported package format version {version}")]
    UnsupportedVersion { version: u32 },

    #[error("header checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("unknown module type {value:#x}")]
    UnknownModuleType { value: u32 },
}

/// Errors related to building and reading packages
#[derive(Error, Debug)]
pub enum PackageError {
    /// Required package metadata is empty
    #[error("package {field} is required")]
    MissingField { field: &'static str },

    #[error("at least one file must be included in the package")]
    NoFiles,

    #[error("input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("empty internal path for input file {path}")]
    EmptyInternalPath { path: PathBuf },

    #[error("duplicate internal path '{path}'")]
    DuplicateInternalPath { path: String },

    #[error("entry module '{path}' is not part of the package")]
    UnknownEntry { path: String },

    #[error("input file {path} changed while packaging: expected {expected} bytes, read {actual}")]
    SizeChanged {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed package {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("package {path} is truncated: needs {expected} bytes, has {actual}")]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("module '{name}' (offset {offset}, size {size}) lies outside the data section")]
    EntryOutOfRange { name: String, offset: u64, size: u64 },

    #[error("refusing to extract module with unsafe path '{name}'")]
    UnsafePath { name: String },
}

/// Errors related to the cross-compilation toolchain
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("toolchain directory '{path}' is not a valid directory")]
    InvalidToolchainDir { path: PathBuf },

    #[error("required tool '{tool}' not found in '{dir}': looked for {}", .candidates.join(", "))]
    ToolNotFound {
        tool: &'static str,
        dir: PathBuf,
        candidates: Vec<String>,
    },

    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("executable '{program}' was not found")]
    ExecutableNotFound { program: String },

    #[error("command timed out after {seconds} seconds: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed:\n{output}")]
    StepFailed { step: BuildStep, output: String },

    #[error("compiled binary not found at {path}")]
    MissingOutput { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("missing setting '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid value '{value}' for '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("refusing to overwrite existing file {path} (use --force)")]
    AlreadyExists { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to deploying to QEMU
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("SDKK file not found: {path}")]
    PackageNotFound { path: PathBuf },

    #[error("kernel ELF not found: {path}")]
    KernelNotFound { path: PathBuf },

    #[error("build directory not found or is not a directory: {path}")]
    InvalidBuildDir { path: PathBuf },

    #[error("failed to create application directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("QEMU executable '{program}' not found; make sure QEMU is installed and on PATH")]
    QemuNotFound { program: String },

    #[error("failed to launch QEMU: {source}")]
    Launch {
        #[source]
        source: std::io::Error,
    },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Generic {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    /// Creates a read error, folding NotFound into InputNotFound
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == ErrorKind::NotFound {
            PackageError::InputNotFound { path }
        } else {
            PackageError::Read { path, source }
        }
    }

    /// Creates a new Write error
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new Format error
    pub fn format(path: impl Into<PathBuf>, source: FormatError) -> Self {
        PackageError::Format {
            path: path.into(),
            source,
        }
    }
}

impl ToolchainError {
    /// Creates a new Io error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolchainError::Io {
            path: path.into(),
            source,
        }
    }
}

impl IoError {
    /// Creates an IO error, folding NotFound into its own variant
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == ErrorKind::NotFound {
            IoError::NotFound { path }
        } else {
            IoError::Generic { path, source }
        }
    }
}

fn io_status(source: &std::io::Error, fallback: StatusCode) -> StatusCode {
    match source.kind() {
        ErrorKind::NotFound => StatusCode::NotFound,
        ErrorKind::PermissionDenied => StatusCode::AccessDenied,
        ErrorKind::OutOfMemory => StatusCode::NoMemory,
        _ => fallback,
    }
}

impl AppError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Format(_) => StatusCode::InvalidFormat,
            AppError::Package(e) => e.status_code(),
            AppError::Toolchain(e) => e.status_code(),
            AppError::Config(e) => e.status_code(),
            AppError::Deploy(e) => e.status_code(),
            AppError::Io(e) => e.status_code(),
        }
    }
}

impl PackageError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PackageError::MissingField { .. }
            | PackageError::NoFiles
            | PackageError::EmptyInternalPath { .. }
            | PackageError::DuplicateInternalPath { .. }
            | PackageError::UnknownEntry { .. } => StatusCode::InvalidArg,
            PackageError::InputNotFound { .. } => StatusCode::NotFound,
            PackageError::SizeChanged { .. } => StatusCode::FileRead,
            PackageError::Read { source, .. } => io_status(source, StatusCode::FileRead),
            PackageError::Write { source, .. } => io_status(source, StatusCode::Generic),
            PackageError::Format { .. }
            | PackageError::Truncated { .. }
            | PackageError::EntryOutOfRange { .. } => StatusCode::InvalidFormat,
            PackageError::UnsafePath { .. } => StatusCode::AccessDenied,
        }
    }
}

impl ToolchainError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ToolchainError::InvalidToolchainDir { .. }
            | ToolchainError::ToolNotFound { .. }
            | ToolchainError::SourceNotFound { .. }
            | ToolchainError::ExecutableNotFound { .. }
            | ToolchainError::MissingOutput { .. } => StatusCode::NotFound,
            ToolchainError::Io { source, .. } | ToolchainError::Spawn { source, .. } => {
                io_status(source, StatusCode::Generic)
            }
            ToolchainError::Timeout { .. } | ToolchainError::StepFailed { .. } => {
                StatusCode::Generic
            }
        }
    }
}

impl ConfigError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConfigError::NotFound { .. } => StatusCode::NotFound,
            ConfigError::Read { source, .. } => io_status(source, StatusCode::FileRead),
            ConfigError::Parse { .. }
            | ConfigError::MissingField { .. }
            | ConfigError::InvalidValue { .. } => StatusCode::InvalidArg,
            ConfigError::AlreadyExists { .. } => StatusCode::AccessDenied,
            ConfigError::Write { source, .. } => io_status(source, StatusCode::Generic),
        }
    }
}

impl IoError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            IoError::NotFound { .. } => StatusCode::NotFound,
            IoError::Generic { source, .. } => io_status(source, StatusCode::FileRead),
        }
    }
}

impl DeployError {
    /// SDK status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeployError::PackageNotFound { .. }
            | DeployError::KernelNotFound { .. }
            | DeployError::InvalidBuildDir { .. }
            | DeployError::QemuNotFound { .. } => StatusCode::NotFound,
            DeployError::CreateDir { source, .. }
            | DeployError::Copy { source, .. }
            | DeployError::Launch { source } => io_status(source, StatusCode::Generic),
        }
    }
}
