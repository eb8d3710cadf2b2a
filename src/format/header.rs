//! The 512-byte package header

use super::{read_fixed, read_u32, read_u64, write_fixed, FORMAT_VERSION, HEADER_SIZE, MAGIC};
use crate::error::FormatError;

/// Length of the package name field
pub const NAME_LEN: usize = 64;
/// Length of the package version field
pub const VERSION_LEN: usize = 16;
/// Length of the package description field
pub const DESCRIPTION_LEN: usize = 256;
/// Offset of the checksum, which covers every byte before it
pub const CHECKSUM_OFFSET: usize = HEADER_SIZE - 4;

const VERSION_FIELD_OFFSET: usize = 4;
const NAME_OFFSET: usize = 8;
const PKG_VERSION_OFFSET: usize = NAME_OFFSET + NAME_LEN; // 72
const DESCRIPTION_OFFSET: usize = PKG_VERSION_OFFSET + VERSION_LEN; // 88
const ENTRY_COUNT_OFFSET: usize = DESCRIPTION_OFFSET + DESCRIPTION_LEN; // 344
const ENTRIES_OFFSET_OFFSET: usize = ENTRY_COUNT_OFFSET + 4; // 348
const DATA_OFFSET_OFFSET: usize = ENTRIES_OFFSET_OFFSET + 8; // 356
const DATA_SIZE_OFFSET: usize = DATA_OFFSET_OFFSET + 8; // 364
const HASH_OFFSET: usize = DATA_SIZE_OFFSET + 8; // 372
const HASH_LEN: usize = 32;
// bytes HASH_OFFSET + HASH_LEN .. CHECKSUM_OFFSET are reserved and zero

/// Decoded package header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageHeader {
    pub format_version: u32,
    pub name: String,
    pub version: String,
    pub description: String,
    pub entry_count: u32,
    pub entries_table_offset: u64,
    pub data_section_offset: u64,
    pub data_section_size: u64,
    /// SHA-256 of the whole data section
    pub data_sha256: [u8; 32],
    /// Checksum as stored on disk (set by `decode`/`encode`)
    pub checksum: u32,
}

/// Wrapping 32-bit sum of every header byte before the checksum field
pub fn compute_checksum(bytes: &[u8; HEADER_SIZE]) -> u32 {
    bytes[..CHECKSUM_OFFSET]
        .iter()
        .fold(0u32, |acc, &b| acc.wrapping_add(u32::from(b)))
}

impl PackageHeader {
    /// Serialize the header, computing and embedding its checksum
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[VERSION_FIELD_OFFSET..VERSION_FIELD_OFFSET + 4]
            .copy_from_slice(&self.format_version.to_le_bytes());
        write_fixed(&mut buf[NAME_OFFSET..PKG_VERSION_OFFSET], &self.name);
        write_fixed(
            &mut buf[PKG_VERSION_OFFSET..DESCRIPTION_OFFSET],
            &self.version,
        );
        write_fixed(
            &mut buf[DESCRIPTION_OFFSET..ENTRY_COUNT_OFFSET],
            &self.description,
        );
        buf[ENTRY_COUNT_OFFSET..ENTRIES_OFFSET_OFFSET]
            .copy_from_slice(&self.entry_count.to_le_bytes());
        buf[ENTRIES_OFFSET_OFFSET..DATA_OFFSET_OFFSET]
            .copy_from_slice(&self.entries_table_offset.to_le_bytes());
        buf[DATA_OFFSET_OFFSET..DATA_SIZE_OFFSET]
            .copy_from_slice(&self.data_section_offset.to_le_bytes());
        buf[DATA_SIZE_OFFSET..HASH_OFFSET].copy_from_slice(&self.data_section_size.to_le_bytes());
        buf[HASH_OFFSET..HASH_OFFSET + HASH_LEN].copy_from_slice(&self.data_sha256);

        let checksum = compute_checksum(&buf);
        buf[CHECKSUM_OFFSET..].copy_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Decode and fully validate a header, including its checksum
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let header = Self::decode_unverified(bytes)?;
        let computed = Self::checksum_of(bytes)?;
        if computed != header.checksum {
            return Err(FormatError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }
        Ok(header)
    }

    /// Decode a header, checking length, magic and version but not the checksum
    pub fn decode_unverified(bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() != HEADER_SIZE {
            return Err(FormatError::InvalidLength {
                what: "package header",
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if magic != MAGIC {
            return Err(FormatError::BadMagic { found: magic });
        }

        let format_version = read_u32(bytes, VERSION_FIELD_OFFSET);
        if format_version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion {
                version: format_version,
            });
        }

        let mut data_sha256 = [0u8; HASH_LEN];
        data_sha256.copy_from_slice(&bytes[HASH_OFFSET..HASH_OFFSET + HASH_LEN]);

        Ok(Self {
            format_version,
            name: read_fixed(&bytes[NAME_OFFSET..PKG_VERSION_OFFSET]),
            version: read_fixed(&bytes[PKG_VERSION_OFFSET..DESCRIPTION_OFFSET]),
            description: read_fixed(&bytes[DESCRIPTION_OFFSET..ENTRY_COUNT_OFFSET]),
            entry_count: read_u32(bytes, ENTRY_COUNT_OFFSET),
            entries_table_offset: read_u64(bytes, ENTRIES_OFFSET_OFFSET),
            data_section_offset: read_u64(bytes, DATA_OFFSET_OFFSET),
            data_section_size: read_u64(bytes, DATA_SIZE_OFFSET),
            data_sha256,
            checksum: read_u32(bytes, CHECKSUM_OFFSET),
        })
    }

    /// Checksum computed over raw header bytes
    pub fn checksum_of(bytes: &[u8]) -> Result<u32, FormatError> {
        let raw: &[u8; HEADER_SIZE] =
            bytes
                .try_into()
                .map_err(|_| FormatError::InvalidLength {
                    what: "package header",
                    expected: HEADER_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(compute_checksum(raw))
    }
}
