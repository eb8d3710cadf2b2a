//! Package builder
//!
//! The package is written in one pass: a zeroed header placeholder, the entries table,
//! padding to the aligned data offset and the streamed module contents. The header is
//! rewritten last, once the SHA-256 of the data section is known.

use super::normalize_internal_path;
use crate::error::PackageError;
use crate::format::{
    data_section_offset, entries_table_offset, fits_fixed, truncate_fixed, ModuleEntry, ModuleFlags, ModuleType,
    PackageHeader, DESCRIPTION_LEN, ENTRY_NAME_LEN, FORMAT_VERSION, HEADER_SIZE, NAME_LEN,
    SIGNATURE_LEN, VERSION_LEN,
};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 4096;

/// A host file to include in a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    pub host_path: PathBuf,
    pub internal_path: String,
    /// Overrides the default type (Application for the entry module, Data otherwise)
    pub module_type: Option<ModuleType>,
    /// Overrides the default flags (EXECUTABLE for the entry module, none otherwise)
    pub flags: Option<ModuleFlags>,
}

impl PackageFile {
    pub fn new(host_path: impl Into<PathBuf>, internal_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            internal_path: internal_path.into(),
            module_type: None,
            flags: None,
        }
    }

    pub fn with_type(mut self, module_type: ModuleType) -> Self {
        self.module_type = Some(module_type);
        self
    }

    pub fn with_flags(mut self, flags: ModuleFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Parse `HOST[=INTERNAL]`; without `=INTERNAL` the file name is used
    pub fn from_arg(arg: &str) -> Self {
        match arg.split_once('=') {
            Some((host, internal)) => Self::new(host, internal),
            None => {
                let host = PathBuf::from(arg);
                let internal = host
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| arg.to_string());
                Self::new(host, internal)
            }
        }
    }
}

/// Everything needed to build a package
#[derive(Debug, Clone, Default)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    pub description: String,
    pub files: Vec<PackageFile>,
    /// Internal path of the entry module; defaults to the first listed file
    pub entry: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_file(mut self, file: PackageFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }
}

/// A module with its resolved placement in the data section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedModule {
    pub host_path: PathBuf,
    pub entry: ModuleEntry,
}

/// Resolved layout of a package before anything is written
#[derive(Debug, Clone)]
pub struct LayoutPlan {
    /// Modules ordered by internal path
    pub modules: Vec<PlannedModule>,
    pub data_section_offset: u64,
    pub data_section_size: u64,
    pub warnings: Vec<String>,
}

impl LayoutPlan {
    /// Size of the finished package file
    pub fn total_size(&self) -> u64 {
        self.data_section_offset + self.data_section_size
    }

    /// Bytes of zero padding between the entries table and the data section
    pub fn padding(&self) -> u64 {
        let end_of_entries =
            entries_table_offset() + (self.modules.len() * crate::format::ENTRY_SIZE) as u64;
        self.data_section_offset - end_of_entries
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct PackageSummary {
    pub path: PathBuf,
    pub header: PackageHeader,
    pub entries: Vec<ModuleEntry>,
    pub total_size: u64,
    pub warnings: Vec<String>,
}

/// Truncation warnings for header fields that do not fit their fixed-width slots
pub fn header_field_warnings(name: &str, version: &str, description: &str) -> Vec<String> {
    [
        ("name", name, NAME_LEN),
        ("version", version, VERSION_LEN),
        ("description", description, DESCRIPTION_LEN),
    ]
    .into_iter()
    .filter(|(_, value, len)| !fits_fixed(value, *len))
    .map(|(field, value, len)| {
        format!(
            "package {} is {} bytes long and will be truncated to {} bytes",
            field,
            value.len(),
            len - 1
        )
    })
    .collect()
}

/// Validate a spec and compute the package layout
pub fn plan_layout(spec: &PackageSpec) -> Result<LayoutPlan, PackageError> {
    if spec.name.trim().is_empty() {
        return Err(PackageError::MissingField { field: "name" });
    }
    if spec.version.trim().is_empty() {
        return Err(PackageError::MissingField { field: "version" });
    }
    if spec.files.is_empty() {
        return Err(PackageError::NoFiles);
    }

    let mut warnings = header_field_warnings(&spec.name, &spec.version, &spec.description);

    let entry_path = match &spec.entry {
        Some(entry) => normalize_internal_path(entry),
        None => normalize_internal_path(&spec.files[0].internal_path),
    };

    let mut seen = HashSet::new();
    let mut stored_names = HashSet::new();
    let mut modules = Vec::with_capacity(spec.files.len());

    for file in &spec.files {
        let internal = normalize_internal_path(&file.internal_path);
        if internal.is_empty() {
            return Err(PackageError::EmptyInternalPath {
                path: file.host_path.clone(),
            });
        }
        if !seen.insert(internal.clone()) {
            return Err(PackageError::DuplicateInternalPath { path: internal });
        }

        let metadata =
            fs::metadata(&file.host_path).map_err(|e| PackageError::read(&file.host_path, e))?;
        if !metadata.is_file() {
            return Err(PackageError::InputNotFound {
                path: file.host_path.clone(),
            });
        }

        if !fits_fixed(&internal, ENTRY_NAME_LEN) {
            warnings.push(format!(
                "internal path '{}' is too long ({} bytes), truncating to {} bytes",
                internal,
                internal.len(),
                ENTRY_NAME_LEN - 1
            ));
        }
        // Entries are looked up by their stored name, so two paths sharing the
        // truncated prefix would be indistinguishable.
        let stored = truncate_fixed(&internal, ENTRY_NAME_LEN).to_string();
        if !stored_names.insert(stored.clone()) {
            return Err(PackageError::DuplicateInternalPath { path: stored });
        }

        let is_entry = internal == entry_path;
        let module_type = file.module_type.unwrap_or(if is_entry {
            ModuleType::Application
        } else {
            ModuleType::Data
        });
        let flags = file.flags.unwrap_or(if is_entry {
            ModuleFlags::EXECUTABLE
        } else {
            ModuleFlags::empty()
        });

        modules.push(PlannedModule {
            host_path: file.host_path.clone(),
            entry: ModuleEntry {
                name: stored,
                offset: 0,
                size: metadata.len(),
                module_type,
                flags,
                signature: [0u8; SIGNATURE_LEN],
            },
        });
    }

    if !seen.contains(&entry_path) {
        return Err(PackageError::UnknownEntry { path: entry_path });
    }

    modules.sort_by(|a, b| a.entry.name.cmp(&b.entry.name));

    let mut offset = 0u64;
    for module in &mut modules {
        module.entry.offset = offset;
        offset += module.entry.size;
    }

    Ok(LayoutPlan {
        data_section_offset: data_section_offset(modules.len()),
        data_section_size: offset,
        modules,
        warnings,
    })
}

/// Build a package at `output`
///
/// The output directory is created when missing. A partially written file is removed
/// on failure.
pub fn build_package(spec: &PackageSpec, output: &Path) -> Result<PackageSummary, PackageError> {
    let plan = plan_layout(spec)?;
    build_package_with_plan(spec, plan, output)
}

/// Write a package from a layout computed earlier by `plan_layout`
///
/// Input files must still have the sizes recorded in the plan; a file that changed
/// fails the build with `SizeChanged`.
pub fn build_package_with_plan(
    spec: &PackageSpec,
    plan: LayoutPlan,
    output: &Path,
) -> Result<PackageSummary, PackageError> {
    info!(package = %spec.name, output = %output.display(), "building SDKK package");

    for warning in &plan.warnings {
        warn!("{}", warning);
    }
    debug!(
        entries = plan.modules.len(),
        padding = plan.padding(),
        data_offset = plan.data_section_offset,
        data_size = plan.data_section_size,
        "package layout"
    );

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!(dir = %parent.display(), "creating output directory");
            fs::create_dir_all(parent).map_err(|e| PackageError::write(parent, e))?;
        }
    }

    let file = File::create(output).map_err(|e| PackageError::write(output, e))?;
    match write_package(file, spec, &plan, output) {
        Ok(header) => {
            info!(
                size = plan.total_size(),
                sha256 = %crate::format::to_hex(&header.data_sha256),
                "package built"
            );
            Ok(PackageSummary {
                path: output.to_path_buf(),
                header,
                entries: plan.modules.iter().map(|m| m.entry.clone()).collect(),
                total_size: plan.total_size(),
                warnings: plan.warnings,
            })
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(output) {
                warn!(path = %output.display(), error = %cleanup, "failed to remove partial package");
            }
            Err(e)
        }
    }
}

fn write_package(
    file: File,
    spec: &PackageSpec,
    plan: &LayoutPlan,
    output: &Path,
) -> Result<PackageHeader, PackageError> {
    let write_err = |e: std::io::Error| PackageError::write(output, e);
    let mut out = BufWriter::new(file);

    out.write_all(&[0u8; HEADER_SIZE]).map_err(write_err)?;
    for module in &plan.modules {
        out.write_all(&module.entry.encode()).map_err(write_err)?;
        debug!(
            name = %module.entry.name,
            offset = module.entry.offset,
            size = module.entry.size,
            module_type = %module.entry.module_type,
            flags = %module.entry.flags,
            "wrote entry"
        );
    }
    out.write_all(&vec![0u8; plan.padding() as usize])
        .map_err(write_err)?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    for module in &plan.modules {
        let mut input =
            File::open(&module.host_path).map_err(|e| PackageError::read(&module.host_path, e))?;
        let mut written = 0u64;
        loop {
            let n = input
                .read(&mut buf)
                .map_err(|e| PackageError::read(&module.host_path, e))?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n]).map_err(write_err)?;
            hasher.update(&buf[..n]);
            written += n as u64;
        }
        if written != module.entry.size {
            return Err(PackageError::SizeChanged {
                path: module.host_path.clone(),
                expected: module.entry.size,
                actual: written,
            });
        }
    }

    let mut header = PackageHeader {
        format_version: FORMAT_VERSION,
        name: spec.name.clone(),
        version: spec.version.clone(),
        description: spec.description.clone(),
        entry_count: plan.modules.len() as u32,
        entries_table_offset: entries_table_offset(),
        data_section_offset: plan.data_section_offset,
        data_section_size: plan.data_section_size,
        data_sha256: hasher.finalize().into(),
        checksum: 0,
    };
    let encoded = header.encode();
    header = PackageHeader::decode_unverified(&encoded)
        .map_err(|e| PackageError::format(output, e))?;

    let mut file = out.into_inner().map_err(|e| write_err(e.into_error()))?;
    file.seek(SeekFrom::Start(0)).map_err(write_err)?;
    file.write_all(&encoded).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    Ok(header)
}
