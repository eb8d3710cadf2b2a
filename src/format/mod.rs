//! On-disk layout of `.sdkk` packages
//!
//! A package is laid out as:
//! - a 512-byte header
//! - `entry_count` module entries of 256 bytes each
//! - zero padding up to the next 512-byte boundary
//! - the data section, module contents concatenated in entry order
//!
//! All integers are little-endian.

mod entry;
mod header;
mod status;
mod text;

pub use entry::{ModuleEntry, ModuleFlags, ModuleType, ENTRY_NAME_LEN, SIGNATURE_LEN};
pub use header::{
    compute_checksum, PackageHeader, CHECKSUM_OFFSET, DESCRIPTION_LEN, NAME_LEN, VERSION_LEN,
};
pub use status::StatusCode;
pub use text::{fits_fixed, read_fixed, truncate_fixed, write_fixed};

/// Package magic bytes
pub const MAGIC: [u8; 4] = *b"SDKK";

/// Header format version written by this toolkit
pub const FORMAT_VERSION: u32 = 1;

/// SDK release this toolkit targets
pub const SDK_VERSION: &str = "1.0";

/// Page size of the Doors kernel
pub const PAGE_SIZE: u64 = 0x1000;

/// Longest path the Doors file APIs accept
pub const MAX_PATH: usize = 256;

/// Size of the package header in bytes
pub const HEADER_SIZE: usize = 512;

/// Size of one module entry in bytes
pub const ENTRY_SIZE: usize = 256;

/// Alignment of the data section
pub const DATA_ALIGNMENT: u64 = 512;

/// Round `value` up to a multiple of `alignment` (a power of two)
pub fn align_up(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Offset of the entries table
pub fn entries_table_offset() -> u64 {
    HEADER_SIZE as u64
}

/// Offset of the data section for a package holding `entry_count` modules
pub fn data_section_offset(entry_count: usize) -> u64 {
    let end_of_entries = entries_table_offset() + (entry_count * ENTRY_SIZE) as u64;
    align_up(end_of_entries, DATA_ALIGNMENT)
}

/// Lowercase hex rendering of a digest
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(raw)
}

pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(raw)
}
