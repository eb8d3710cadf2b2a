//! Module entries and their type/flag vocabulary

use super::{read_fixed, read_u32, read_u64, write_fixed, ENTRY_SIZE};
use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the module name (internal path) field
pub const ENTRY_NAME_LEN: usize = 64;
/// Length of the signature field
pub const SIGNATURE_LEN: usize = 32;

const OFFSET_AT: usize = 64;
const SIZE_AT: usize = 72;
const TYPE_AT: usize = 80;
const FLAGS_AT: usize = 84;
const SIGNATURE_AT: usize = 88;

/// Kind of module stored in a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Application,
    Driver,
    Data,
    Update,
}

impl ModuleType {
    /// On-disk value
    pub fn value(self) -> u32 {
        match self {
            ModuleType::Application => 0x01,
            ModuleType::Driver => 0x02,
            ModuleType::Data => 0x04,
            ModuleType::Update => 0x08,
        }
    }

    /// Display label
    pub fn label(self) -> &'static str {
        match self {
            ModuleType::Application => "application",
            ModuleType::Driver => "driver",
            ModuleType::Data => "data",
            ModuleType::Update => "update",
        }
    }
}

impl TryFrom<u32> for ModuleType {
    type Error = FormatError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(ModuleType::Application),
            0x02 => Ok(ModuleType::Driver),
            0x04 => Ok(ModuleType::Data),
            0x08 => Ok(ModuleType::Update),
            other => Err(FormatError::UnknownModuleType { value: other }),
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bit set of module flags
///
/// Unknown bits survive a decode/encode cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModuleFlags(u32);

impl ModuleFlags {
    pub const EXECUTABLE: ModuleFlags = ModuleFlags(0x01);
    pub const COMPRESSED: ModuleFlags = ModuleFlags(0x02);
    pub const SIGNED: ModuleFlags = ModuleFlags(0x04);
    pub const READONLY: ModuleFlags = ModuleFlags(0x08);

    const NAMED: [(ModuleFlags, &'static str); 4] = [
        (ModuleFlags::EXECUTABLE, "executable"),
        (ModuleFlags::COMPRESSED, "compressed"),
        (ModuleFlags::SIGNED, "signed"),
        (ModuleFlags::READONLY, "readonly"),
    ];

    pub const fn empty() -> Self {
        ModuleFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        ModuleFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: ModuleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ModuleFlags) {
        self.0 |= other.0;
    }

    /// Look up a flag by its lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMED
            .iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(flag, _)| *flag)
    }

    /// Names of the known flags that are set
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, n)| *n)
            .collect()
    }
}

impl std::ops::BitOr for ModuleFlags {
    type Output = ModuleFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        ModuleFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for ModuleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut parts: Vec<String> = self.names().iter().map(|n| n.to_string()).collect();
        let known = Self::NAMED.iter().fold(0, |acc, (flag, _)| acc | flag.0);
        let unknown = self.0 & !known;
        if unknown != 0 {
            parts.push(format!("{:#x}", unknown));
        }
        f.write_str(&parts.join("|"))
    }
}

/// A module entry of the entries table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    /// Internal path of the module inside the package
    pub name: String,
    /// Offset relative to the start of the data section
    pub offset: u64,
    pub size: u64,
    pub module_type: ModuleType,
    pub flags: ModuleFlags,
    pub signature: [u8; SIGNATURE_LEN],
}

impl ModuleEntry {
    /// Serialize the entry; names longer than 63 bytes are truncated
    pub fn encode(&self) -> [u8; ENTRY_SIZE] {
        let mut buf = [0u8; ENTRY_SIZE];
        write_fixed(&mut buf[..ENTRY_NAME_LEN], &self.name);
        buf[OFFSET_AT..SIZE_AT].copy_from_slice(&self.offset.to_le_bytes());
        buf[SIZE_AT..TYPE_AT].copy_from_slice(&self.size.to_le_bytes());
        buf[TYPE_AT..FLAGS_AT].copy_from_slice(&self.module_type.value().to_le_bytes());
        buf[FLAGS_AT..SIGNATURE_AT].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[SIGNATURE_AT..SIGNATURE_AT + SIGNATURE_LEN].copy_from_slice(&self.signature);
        buf
    }

    /// Decode an entry
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != ENTRY_SIZE {
            return Err(FormatError::InvalidLength {
                what: "module entry",
                expected: ENTRY_SIZE,
                actual: bytes.len(),
            });
        }

        let module_type = ModuleType::try_from(read_u32(bytes, TYPE_AT))?;
        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&bytes[SIGNATURE_AT..SIGNATURE_AT + SIGNATURE_LEN]);

        Ok(Self {
            name: read_fixed(&bytes[..ENTRY_NAME_LEN]),
            offset: read_u64(bytes, OFFSET_AT),
            size: read_u64(bytes, SIZE_AT),
            module_type,
            flags: ModuleFlags::from_bits(read_u32(bytes, FLAGS_AT)),
            signature,
        })
    }

    /// Whether the entry carries a non-zero signature
    pub fn is_signed(&self) -> bool {
        self.signature.iter().any(|&b| b != 0)
    }
}
