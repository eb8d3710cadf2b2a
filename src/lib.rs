//! sdkk - Doors SDKK package toolkit library
//!
//! This library provides the core functionality behind the `sdkk` binary:
//! - The `.sdkk` binary format (header, module entries, status codes)
//! - Package building, reading, verification and extraction
//! - The MinGW compile → link → objcopy pipeline
//! - Source dependency scanning and C syntax highlighting
//! - Deployment of packages into QEMU

pub mod cli;
pub mod config;
pub mod deploy;
pub mod deps;
pub mod error;
pub mod format;
pub mod highlight;
pub mod orchestrator;
pub mod output;
pub mod package;
pub mod progress;
pub mod toolchain;
