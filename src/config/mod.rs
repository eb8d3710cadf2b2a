//! Project configuration (`sdkk.toml`)
//!
//! This module provides:
//! - Parsing of `sdkk.toml` with serde and toml
//! - Resolution of relative paths against the project directory
//! - Defaults for the build and deploy settings
//! - `init_project`: project scaffolding

mod init;

pub use init::{init_project, InitOutcome, MAIN_C_TEMPLATE};

use crate::deploy::{qemu_executable, DeployRequest, DEFAULT_APP_SUBDIR, DEFAULT_MEMORY};
use crate::error::ConfigError;
use crate::format::{ModuleFlags, ModuleType};
use crate::package::{header_field_warnings, normalize_internal_path, PackageFile};
use crate::toolchain::{default_toolchain_dir, Arch, CompileOptions, DEFAULT_ENTRY};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "sdkk.toml";

/// Environment variable overriding `build.toolchain_dir`
pub const TOOLCHAIN_DIR_ENV: &str = "SDKK_TOOLCHAIN_DIR";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    package: RawPackage,
    #[serde(default)]
    build: RawBuild,
    #[serde(default)]
    files: Vec<RawFile>,
    #[serde(default)]
    deploy: RawDeploy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPackage {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    source: Option<PathBuf>,
    arch: Option<Arch>,
    entry: Option<String>,
    toolchain_dir: Option<PathBuf>,
    linker_script: Option<PathBuf>,
    output: Option<PathBuf>,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    host: PathBuf,
    path: Option<String>,
    #[serde(rename = "type")]
    module_type: Option<ModuleType>,
    flags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeploy {
    kernel: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    app_subdir: Option<String>,
    memory: Option<String>,
    qemu: Option<String>,
    #[serde(default)]
    qemu_args: Vec<String>,
}

/// Resolved `[build]` settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub source: PathBuf,
    pub arch: Arch,
    pub entry: String,
    pub toolchain_dir: PathBuf,
    pub linker_script: Option<PathBuf>,
    pub output: PathBuf,
    pub include_dirs: Vec<PathBuf>,
}

/// Resolved `[deploy]` settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    pub kernel: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub app_subdir: String,
    pub memory: String,
    pub qemu: String,
    pub qemu_args: Vec<String>,
}

/// A loaded project configuration with every path made absolute-or-root-relative
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    /// Directory containing `sdkk.toml`
    pub root: PathBuf,
    pub name: String,
    pub version: String,
    pub description: String,
    pub build: BuildSettings,
    /// Extra files packed next to the compiled binary
    pub files: Vec<PackageFile>,
    pub deploy: DeploySettings,
    pub warnings: Vec<String>,
}

/// Command-line overrides for `[build]`
#[derive(Debug, Clone, Default)]
pub struct BuildOverrides {
    pub arch: Option<Arch>,
    pub toolchain_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub linker_script: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load and resolve a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading project configuration");
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let root = std::path::absolute(parent).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path, &root)
    }

    /// Parse configuration text; `root` anchors relative paths
    pub fn parse(content: &str, path: &Path, root: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        Self::resolve(raw, root)
    }

    fn resolve(raw: RawConfig, root: &Path) -> Result<Self, ConfigError> {
        let resolve_path = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root.join(p)
            }
        };

        let name = required(raw.package.name, "package.name")?;
        let version = required(raw.package.version, "package.version")?;
        let mut warnings = Vec::new();
        if semver::Version::parse(&version).is_err() {
            warnings.push(format!("version '{}' is not a semantic version", version));
        }
        warnings.extend(header_field_warnings(
            &name,
            &version,
            &raw.package.description,
        ));

        let build = BuildSettings {
            source: resolve_path(
                raw.build
                    .source
                    .as_deref()
                    .unwrap_or_else(|| Path::new("src/main.c")),
            ),
            arch: raw.build.arch.unwrap_or_default(),
            entry: raw
                .build
                .entry
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ENTRY.to_string()),
            toolchain_dir: raw
                .build
                .toolchain_dir
                .as_deref()
                .map(resolve_path)
                .unwrap_or_else(default_toolchain_dir),
            linker_script: raw.build.linker_script.as_deref().map(resolve_path),
            output: resolve_path(
                &raw.build
                    .output
                    .unwrap_or_else(|| Path::new("build").join(format!("{}.sdkk", name))),
            ),
            include_dirs: raw
                .build
                .include_dirs
                .iter()
                .map(|d| resolve_path(d))
                .collect(),
        };

        let mut files = Vec::with_capacity(raw.files.len());
        for file in raw.files {
            let host = resolve_path(&file.host);
            let internal = match file.path {
                Some(p) => normalize_internal_path(&p),
                None => file
                    .host
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let mut package_file = PackageFile::new(host, internal);
            if let Some(module_type) = file.module_type {
                package_file = package_file.with_type(module_type);
            }
            if let Some(names) = file.flags {
                package_file = package_file.with_flags(parse_flags(&names)?);
            }
            files.push(package_file);
        }

        let deploy = DeploySettings {
            kernel: raw.deploy.kernel.as_deref().map(resolve_path),
            build_dir: raw.deploy.build_dir.as_deref().map(resolve_path),
            app_subdir: raw
                .deploy
                .app_subdir
                .unwrap_or_else(|| DEFAULT_APP_SUBDIR.to_string()),
            memory: raw
                .deploy
                .memory
                .unwrap_or_else(|| DEFAULT_MEMORY.to_string()),
            qemu: raw
                .deploy
                .qemu
                .unwrap_or_else(|| qemu_executable().to_string()),
            qemu_args: raw.deploy.qemu_args,
        };

        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(Self {
            root: root.to_path_buf(),
            name,
            version,
            description: raw.package.description,
            build,
            files,
            deploy,
            warnings,
        })
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: BuildOverrides) {
        if let Some(arch) = overrides.arch {
            self.build.arch = arch;
        }
        if let Some(dir) = overrides.toolchain_dir {
            self.build.toolchain_dir = dir;
        }
        if let Some(output) = overrides.output {
            self.build.output = output;
        }
        if let Some(script) = overrides.linker_script {
            self.build.linker_script = Some(script);
        }
    }

    /// Options for the compile pipeline
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            arch: self.build.arch,
            entry: self.build.entry.clone(),
            toolchain_dir: self.build.toolchain_dir.clone(),
            linker_script: self.build.linker_script.clone(),
            include_dirs: self.build.include_dirs.clone(),
        }
    }

    /// Deployment request for `package` using the `[deploy]` settings
    pub fn deploy_request(&self, package: PathBuf) -> Result<DeployRequest, ConfigError> {
        self.deploy.clone().request(package, None, None)
    }
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            kernel: None,
            build_dir: None,
            app_subdir: DEFAULT_APP_SUBDIR.to_string(),
            memory: DEFAULT_MEMORY.to_string(),
            qemu: qemu_executable().to_string(),
            qemu_args: Vec::new(),
        }
    }
}

impl DeploySettings {
    /// Deployment request; explicit `kernel` and `build_dir` win over the settings
    pub fn request(
        self,
        package: PathBuf,
        kernel: Option<PathBuf>,
        build_dir: Option<PathBuf>,
    ) -> Result<DeployRequest, ConfigError> {
        let kernel = kernel.or(self.kernel).ok_or(ConfigError::MissingField {
            field: "deploy.kernel",
        })?;
        let build_dir = build_dir.or(self.build_dir).ok_or(ConfigError::MissingField {
            field: "deploy.build_dir",
        })?;
        let mut request = DeployRequest::new(package, kernel, build_dir)
            .with_app_subdir(self.app_subdir)
            .with_memory(self.memory)
            .with_extra_args(self.qemu_args);
        request.qemu = self.qemu;
        Ok(request)
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingField { field }),
    }
}

/// Parse flag names such as `["executable", "readonly"]`
pub fn parse_flags(names: &[String]) -> Result<ModuleFlags, ConfigError> {
    let mut flags = ModuleFlags::empty();
    for name in names {
        let flag = ModuleFlags::from_name(name).ok_or_else(|| ConfigError::InvalidValue {
            field: "files.flags",
            value: name.clone(),
            message: "expected executable, compressed, signed or readonly".to_string(),
        })?;
        flags.insert(flag);
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[package]
name = "hello"
version = "1.0.0"
description = "Hello world for Doors"

[build]
source = "src/hello.c"
arch = "i686"
entry = "kmain"
toolchain_dir = "/opt/mingw/bin"
linker_script = "linker.ld"
include_dirs = ["include"]

[[files]]
host = "assets/logo.bmp"
path = "res\\logo.bmp"
flags = ["readonly"]

[[files]]
host = "drivers/kbd.bin"
type = "driver"

[deploy]
kernel = "../doors/kernel.elf"
build_dir = "../doors/build"
memory = "512M"
qemu_args = ["-no-reboot"]
"#;

    fn parse(content: &str) -> Result<ProjectConfig, ConfigError> {
        ProjectConfig::parse(content, Path::new("/proj/sdkk.toml"), Path::new("/proj"))
    }

    #[test]
    fn test_full_config() {
        let config = parse(FULL).unwrap();
        assert_eq!(config.name, "hello");
        assert_eq!(config.description, "Hello world for Doors");
        assert!(config.warnings.is_empty());

        assert_eq!(config.build.source, PathBuf::from("/proj/src/hello.c"));
        assert_eq!(config.build.arch, Arch::I686);
        assert_eq!(config.build.entry, "kmain");
        assert_eq!(config.build.toolchain_dir, PathBuf::from("/opt/mingw/bin"));
        assert_eq!(
            config.build.linker_script,
            Some(PathBuf::from("/proj/linker.ld"))
        );
        assert_eq!(config.build.output, PathBuf::from("/proj/build/hello.sdkk"));
        assert_eq!(config.build.include_dirs, vec![PathBuf::from("/proj/include")]);

        assert_eq!(config.files.len(), 2);
        assert_eq!(config.files[0].internal_path, "res/logo.bmp");
        assert_eq!(config.files[0].flags, Some(ModuleFlags::READONLY));
        assert_eq!(config.files[1].internal_path, "kbd.bin");
        assert_eq!(config.files[1].module_type, Some(ModuleType::Driver));

        assert_eq!(config.deploy.memory, "512M");
        assert_eq!(config.deploy.app_subdir, "apps");
        assert_eq!(
            config.deploy.kernel,
            Some(PathBuf::from("/proj/../doors/kernel.elf"))
        );
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse("[package]\nname = \"app\"\nversion = \"0.1.0\"\n").unwrap();
        assert_eq!(config.build.source, PathBuf::from("/proj/src/main.c"));
        assert_eq!(config.build.arch, Arch::X86_64);
        assert_eq!(config.build.entry, "_start");
        assert_eq!(config.build.toolchain_dir, default_toolchain_dir());
        assert!(config.build.linker_script.is_none());
        assert_eq!(config.deploy.memory, "256M");
        assert!(config.deploy.kernel.is_none());
        assert!(config.files.is_empty());
    }

    #[test]
    fn test_missing_name() {
        let err = parse("[package]\nversion = \"1.0.0\"\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "package.name"
            }
        ));
    }

    #[test]
    fn test_non_semver_version_warns() {
        let config = parse("[package]\nname = \"a\"\nversion = \"v2\"\n").unwrap();
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("v2"));
    }

    #[test]
    fn test_long_header_fields_warn() {
        let content = format!(
            "[package]\nname = \"{}\"\nversion = \"1.0.0-{}\"\ndescription = \"{}\"\n",
            "n".repeat(64),
            "rc".repeat(8),
            "d".repeat(256)
        );
        let config = parse(&content).unwrap();
        assert_eq!(config.warnings.len(), 3);
        assert!(config.warnings[0].contains("package name is 64 bytes"));
        assert!(config.warnings[1].contains("truncated to 15 bytes"));
        assert!(config.warnings[2].contains("package description is 256 bytes"));
    }

    #[test]
    fn test_fields_at_limit_do_not_warn() {
        let content = format!(
            "[package]\nname = \"{}\"\nversion = \"1.0.0\"\n",
            "n".repeat(63)
        );
        assert!(parse(&content).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = parse("[package]\nname = \"a\"\nversion = \"1.0.0\"\ncolour = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_flag() {
        let content = "[package]\nname = \"a\"\nversion = \"1.0.0\"\n[[files]]\nhost = \"x\"\nflags = [\"fast\"]\n";
        let err = parse(content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_overrides() {
        let mut config = parse("[package]\nname = \"a\"\nversion = \"1.0.0\"\n").unwrap();
        config.apply_overrides(BuildOverrides {
            arch: Some(Arch::I686),
            toolchain_dir: Some(PathBuf::from("/tc")),
            output: None,
            linker_script: None,
        });
        let options = config.compile_options();
        assert_eq!(options.arch, Arch::I686);
        assert_eq!(options.toolchain_dir, PathBuf::from("/tc"));
        assert_eq!(config.build.output, PathBuf::from("/proj/build/a.sdkk"));
    }

    #[test]
    fn test_deploy_request_requires_kernel() {
        let config = parse("[package]\nname = \"a\"\nversion = \"1.0.0\"\n").unwrap();
        let err = config.deploy_request(PathBuf::from("a.sdkk")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "deploy.kernel"
            }
        ));

        let config = parse(FULL).unwrap();
        let request = config.deploy_request(PathBuf::from("a.sdkk")).unwrap();
        assert_eq!(request.memory, "512M");
        assert_eq!(request.extra_args, vec!["-no-reboot".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProjectConfig::load(Path::new("/definitely/not/sdkk.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
