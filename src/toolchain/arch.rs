//! Target architectures

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tool of the cross toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Cc,
    Ld,
    Objcopy,
}

impl Tool {
    /// Short key used in messages
    pub fn key(self) -> &'static str {
        match self {
            Tool::Cc => "cc",
            Tool::Ld => "ld",
            Tool::Objcopy => "objcopy",
        }
    }

    /// Executable name without a target prefix
    pub fn executable(self) -> &'static str {
        match self {
            Tool::Cc => "gcc",
            Tool::Ld => "ld",
            Tool::Objcopy => "objcopy",
        }
    }
}

/// Supported target architectures
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Arch {
    #[default]
    #[serde(rename = "x86_64")]
    #[value(name = "x86_64")]
    X86_64,
    #[serde(rename = "i686")]
    #[value(name = "i686")]
    I686,
}

impl Arch {
    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::I686 => "i686",
        }
    }

    /// MinGW target triple used as tool prefix
    pub fn triple(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64-w64-mingw32",
            Arch::I686 => "i686-w64-mingw32",
        }
    }

    /// Prefixed tool name, e.g. `x86_64-w64-mingw32-gcc`
    pub fn prefixed(self, tool: Tool) -> String {
        format!("{}-{}", self.triple(), tool.executable())
    }

    /// Linker emulation passed with `ld -m`
    pub fn linker_emulation(self) -> &'static str {
        match self {
            Arch::X86_64 => "i386:x86-64",
            Arch::I686 => "i386",
        }
    }

    /// Compiler word-size flag
    pub fn compiler_mode_flag(self) -> &'static str {
        match self {
            Arch::X86_64 => "-m64",
            Arch::I686 => "-m32",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
