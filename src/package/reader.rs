//! Package reader: decode, verify and extract

use crate::error::{FormatError, PackageError};
use crate::format::{to_hex, ModuleEntry, PackageHeader, ENTRY_SIZE, HEADER_SIZE};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

const CHUNK_SIZE: usize = 4096;

/// A single integrity problem found by `PackageReader::verify`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyProblem {
    ChecksumMismatch { stored: u32, computed: u32 },
    DataOutOfBounds { end: u64, file_size: u64 },
    EntryOutOfRange { name: String, offset: u64, size: u64 },
    HashMismatch { expected: String, actual: String },
}

impl fmt::Display for VerifyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyProblem::ChecksumMismatch { stored, computed } => write!(
                f,
                "header checksum mismatch: stored {:#010x}, computed {:#010x}",
                stored, computed
            ),
            VerifyProblem::DataOutOfBounds { end, file_size } => write!(
                f,
                "data section ends at byte {} but the file has {} bytes",
                end, file_size
            ),
            VerifyProblem::EntryOutOfRange { name, offset, size } => write!(
                f,
                "module '{}' (offset {}, size {}) lies outside the data section",
                name, offset, size
            ),
            VerifyProblem::HashMismatch { expected, actual } => write!(
                f,
                "data SHA-256 mismatch: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

/// Result of verifying a package
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub problems: Vec<VerifyProblem>,
    /// SHA-256 of the data section as read, when it could be computed
    pub computed_sha256: Option<String>,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Read access to an `.sdkk` package
#[derive(Debug)]
pub struct PackageReader {
    path: PathBuf,
    file: File,
    file_size: u64,
    header: PackageHeader,
    computed_checksum: u32,
    entries: Vec<ModuleEntry>,
}

impl PackageReader {
    /// Open a package, decoding its header and entries table
    ///
    /// A checksum mismatch does not fail here; `verify` reports it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| PackageError::read(&path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| PackageError::read(&path, e))?
            .len();

        if file_size < HEADER_SIZE as u64 {
            return Err(PackageError::Truncated {
                path,
                expected: HEADER_SIZE as u64,
                actual: file_size,
            });
        }

        let mut raw = [0u8; HEADER_SIZE];
        file.read_exact(&mut raw)
            .map_err(|e| PackageError::read(&path, e))?;
        let header =
            PackageHeader::decode_unverified(&raw).map_err(|e| PackageError::format(&path, e))?;
        let computed_checksum = crate::format::compute_checksum(&raw);

        let table_end = (header.entry_count as u64)
            .checked_mul(ENTRY_SIZE as u64)
            .and_then(|len| len.checked_add(header.entries_table_offset))
            .unwrap_or(u64::MAX);
        if table_end > file_size {
            return Err(PackageError::Truncated {
                path,
                expected: table_end,
                actual: file_size,
            });
        }

        file.seek(SeekFrom::Start(header.entries_table_offset))
            .map_err(|e| PackageError::read(&path, e))?;
        let mut entries = Vec::with_capacity(header.entry_count as usize);
        let mut buf = [0u8; ENTRY_SIZE];
        for _ in 0..header.entry_count {
            file.read_exact(&mut buf)
                .map_err(|e| PackageError::read(&path, e))?;
            entries.push(ModuleEntry::decode(&buf).map_err(|e| PackageError::format(&path, e))?);
        }

        debug!(path = %path.display(), entries = entries.len(), "opened package");
        Ok(Self {
            path,
            file,
            file_size,
            header,
            computed_checksum,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PackageHeader {
        &self.header
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Whether the stored header checksum matches the header bytes
    pub fn checksum_ok(&self) -> bool {
        self.computed_checksum == self.header.checksum
    }

    /// Fail with a format error when the header checksum is wrong
    pub fn require_valid_header(&self) -> Result<(), PackageError> {
        if self.checksum_ok() {
            Ok(())
        } else {
            Err(PackageError::format(
                &self.path,
                FormatError::ChecksumMismatch {
                    stored: self.header.checksum,
                    computed: self.computed_checksum,
                },
            ))
        }
    }

    /// Find a module by internal path
    pub fn find(&self, name: &str) -> Option<&ModuleEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn entry_in_range(&self, entry: &ModuleEntry) -> bool {
        entry
            .offset
            .checked_add(entry.size)
            .is_some_and(|end| end <= self.header.data_section_size)
            && self.data_end().is_some_and(|end| end <= self.file_size)
    }

    fn data_end(&self) -> Option<u64> {
        self.header
            .data_section_offset
            .checked_add(self.header.data_section_size)
    }

    /// Read the contents of one module
    pub fn read_module(&mut self, entry: &ModuleEntry) -> Result<Vec<u8>, PackageError> {
        if !self.entry_in_range(entry) {
            return Err(PackageError::EntryOutOfRange {
                name: entry.name.clone(),
                offset: entry.offset,
                size: entry.size,
            });
        }
        let start = self.header.data_section_offset + entry.offset;
        self.file
            .seek(SeekFrom::Start(start))
            .map_err(|e| PackageError::read(&self.path, e))?;
        let mut data = vec![0u8; entry.size as usize];
        self.file
            .read_exact(&mut data)
            .map_err(|e| PackageError::read(&self.path, e))?;
        Ok(data)
    }

    /// Check header checksum, entry bounds and the data section hash
    ///
    /// Every problem is collected instead of stopping at the first one.
    pub fn verify(&mut self) -> Result<VerifyReport, PackageError> {
        let mut problems = Vec::new();

        if !self.checksum_ok() {
            problems.push(VerifyProblem::ChecksumMismatch {
                stored: self.header.checksum,
                computed: self.computed_checksum,
            });
        }

        for entry in &self.entries {
            let fits = entry
                .offset
                .checked_add(entry.size)
                .is_some_and(|end| end <= self.header.data_section_size);
            if !fits {
                problems.push(VerifyProblem::EntryOutOfRange {
                    name: entry.name.clone(),
                    offset: entry.offset,
                    size: entry.size,
                });
            }
        }

        let data_end = self.data_end().unwrap_or(u64::MAX);
        let mut computed_sha256 = None;
        if data_end > self.file_size {
            problems.push(VerifyProblem::DataOutOfBounds {
                end: data_end,
                file_size: self.file_size,
            });
        } else {
            let digest = self.hash_data_section()?;
            let expected = to_hex(&self.header.data_sha256);
            if digest != expected {
                problems.push(VerifyProblem::HashMismatch {
                    expected,
                    actual: digest.clone(),
                });
            }
            computed_sha256 = Some(digest);
        }

        info!(path = %self.path.display(), problems = problems.len(), "verified package");
        Ok(VerifyReport {
            path: self.path.clone(),
            problems,
            computed_sha256,
        })
    }

    fn hash_data_section(&mut self) -> Result<String, PackageError> {
        self.file
            .seek(SeekFrom::Start(self.header.data_section_offset))
            .map_err(|e| PackageError::read(&self.path, e))?;

        let mut hasher = Sha256::new();
        let mut remaining = self.header.data_section_size;
        let mut buf = [0u8; CHUNK_SIZE];
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE as u64) as usize;
            let n = self
                .file
                .read(&mut buf[..want])
                .map_err(|e| PackageError::read(&self.path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            remaining -= n as u64;
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Extract every module below `dest`, returning the written paths
    pub fn extract(&mut self, dest: &Path) -> Result<Vec<PathBuf>, PackageError> {
        self.require_valid_header()?;

        let entries = self.entries.clone();
        let mut written = Vec::with_capacity(entries.len());
        for entry in &entries {
            let relative = safe_relative_path(&entry.name)?;
            let target = dest.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| PackageError::write(parent, e))?;
            }
            let data = self.read_module(entry)?;
            fs::write(&target, &data).map_err(|e| PackageError::write(&target, e))?;
            debug!(module = %entry.name, target = %target.display(), "extracted module");
            written.push(target);
        }

        info!(count = written.len(), dest = %dest.display(), "extracted package");
        Ok(written)
    }
}

/// Reject internal paths that would escape the extraction directory
fn safe_relative_path(name: &str) -> Result<PathBuf, PackageError> {
    let unsafe_path = || PackageError::UnsafePath {
        name: name.to_string(),
    };
    if name.is_empty() || name.starts_with(['/', '\\']) {
        return Err(unsafe_path());
    }

    let mut relative = PathBuf::new();
    for part in name.split('/') {
        let component_path = Path::new(part);
        let mut components = component_path.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(c)), None) => relative.push(c),
            (Some(Component::CurDir), None) => {}
            _ if part.is_empty() => {}
            _ => return Err(unsafe_path()),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(unsafe_path());
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::{build_package, PackageFile, PackageSpec};
    use std::io::Write;

    fn build_sample(dir: &Path) -> PathBuf {
        fs::write(dir.join("main.bin"), b"\xeb\xfe").unwrap();
        fs::write(dir.join("config.ini"), b"[app]\nname=demo\n").unwrap();
        let output = dir.join("demo.sdkk");
        let spec = PackageSpec::new("demo", "0.1.0")
            .with_file(PackageFile::new(dir.join("main.bin"), "main.bin"))
            .with_file(PackageFile::new(dir.join("config.ini"), "etc/config.ini"));
        build_package(&spec, &output).unwrap();
        output
    }

    #[test]
    fn test_open_and_read_modules() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());

        let mut reader = PackageReader::open(&path).unwrap();
        assert!(reader.checksum_ok());
        assert_eq!(reader.header().name, "demo");
        assert_eq!(reader.entries().len(), 2);

        let entry = reader.find("main.bin").unwrap().clone();
        assert_eq!(reader.read_module(&entry).unwrap(), b"\xeb\xfe");

        let entry = reader.find("etc/config.ini").unwrap().clone();
        assert_eq!(reader.read_module(&entry).unwrap(), b"[app]\nname=demo\n");
    }

    #[test]
    fn test_verify_valid_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let report = PackageReader::open(&path).unwrap().verify().unwrap();
        assert!(report.is_valid(), "{:?}", report.problems);
        assert!(report.computed_sha256.is_some());
    }

    #[test]
    fn test_verify_detects_data_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let report = PackageReader::open(&path).unwrap().verify().unwrap();
        assert_eq!(report.problems.len(), 1);
        assert!(matches!(
            report.problems[0],
            VerifyProblem::HashMismatch { .. }
        ));
    }

    #[test]
    fn test_verify_reports_header_and_truncation_together() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());

        let mut bytes = fs::read(&path).unwrap();
        bytes[10] ^= 0x20; // inside the package name
        bytes.truncate(bytes.len() - 4);
        fs::write(&path, &bytes).unwrap();

        let mut reader = PackageReader::open(&path).unwrap();
        assert!(!reader.checksum_ok());
        let report = reader.verify().unwrap();
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p, VerifyProblem::ChecksumMismatch { .. })));
        assert!(report
            .problems
            .iter()
            .any(|p| matches!(p, VerifyProblem::DataOutOfBounds { .. })));
        assert!(report.computed_sha256.is_none());
    }

    #[test]
    fn test_open_rejects_non_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.sdkk");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0x7f; 600]).unwrap();
        drop(file);

        let err = PackageReader::open(&path).unwrap_err();
        assert!(matches!(
            err,
            PackageError::Format {
                source: FormatError::BadMagic { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_open_rejects_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.sdkk");
        fs::write(&path, b"SDKK").unwrap();
        let err = PackageReader::open(&path).unwrap_err();
        assert!(matches!(err, PackageError::Truncated { actual: 4, .. }));
    }

    #[test]
    fn test_extract_writes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = build_sample(dir.path());
        let dest = dir.path().join("extracted");

        let written = PackageReader::open(&path)
            .unwrap()
            .extract(&dest)
            .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read(dest.join("main.bin")).unwrap(), b"\xeb\xfe");
        assert_eq!(
            fs::read_to_string(dest.join("etc").join("config.ini")).unwrap(),
            "[app]\nname=demo\n"
        );
    }

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(
            safe_relative_path("a/b/c.txt").unwrap(),
            PathBuf::from("a").join("b").join("c.txt")
        );
        assert_eq!(safe_relative_path("./a").unwrap(), PathBuf::from("a"));
        assert!(safe_relative_path("../escape").is_err());
        assert!(safe_relative_path("a/../../b").is_err());
        assert!(safe_relative_path("").is_err());
        assert!(safe_relative_path("/etc/passwd").is_err());
        assert!(safe_relative_path("./").is_err());
    }
}
