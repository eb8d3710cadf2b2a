//! Project scaffolding for `sdkk init`

use super::CONFIG_FILE_NAME;
use crate::error::ConfigError;
use crate::toolchain::DEFAULT_LINKER_SCRIPT;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Starter application source
pub const MAIN_C_TEMPLATE: &str = r#"/* Entry point of a Doors application. */

void _start(void)
{
    for (;;) {
        __asm__ volatile ("hlt");
    }
}
"#;

/// Files written by `init_project`
#[derive(Debug, Clone, Serialize)]
pub struct InitOutcome {
    pub root: PathBuf,
    pub name: String,
    pub created: Vec<PathBuf>,
}

fn config_template(name: &str) -> String {
    // Quoted and escaped TOML strings
    let output = toml::Value::String(format!("build/{}.sdkk", name));
    let name = toml::Value::String(name.to_string());
    format!(
        r#"[package]
name = {name}
version = "1.0.0"
description = ""

[build]
source = "src/main.c"
arch = "x86_64"
entry = "_start"
linker_script = "linker.ld"
output = {output}
include_dirs = []

# [[files]]
# host = "assets/logo.bmp"
# path = "res/logo.bmp"

# [deploy]
# kernel = "../doors/kernel.elf"
# build_dir = "../doors/build"
# app_subdir = "apps"
# memory = "256M"
"#
    )
}

/// Package name derived from a directory name
fn name_from_dir(dir: &Path) -> String {
    let raw = dir
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();
    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let name = name.trim_matches('-').to_string();
    if name.is_empty() {
        "app".to_string()
    } else {
        name
    }
}

/// Scaffold a project in `dir`: `sdkk.toml`, `linker.ld` and `src/main.c`
///
/// Nothing is written when any of the files exists and `force` is off.
pub fn init_project(
    dir: &Path,
    name: Option<&str>,
    force: bool,
) -> Result<InitOutcome, ConfigError> {
    let name = match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        Some(_) => {
            return Err(ConfigError::InvalidValue {
                field: "name",
                value: String::new(),
                message: "package name must not be empty".to_string(),
            })
        }
        None => name_from_dir(dir),
    };

    let files = [
        (dir.join(CONFIG_FILE_NAME), config_template(&name)),
        (dir.join("linker.ld"), DEFAULT_LINKER_SCRIPT.to_string()),
        (dir.join("src").join("main.c"), MAIN_C_TEMPLATE.to_string()),
    ];

    if !force {
        if let Some((path, _)) = files.iter().find(|(path, _)| path.exists()) {
            return Err(ConfigError::AlreadyExists { path: path.clone() });
        }
    }

    let mut created = Vec::with_capacity(files.len());
    for (path, content) in files {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "created");
        created.push(path);
    }

    Ok(InitOutcome {
        root: dir.to_path_buf(),
        name,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;

    #[test]
    fn test_init_creates_loadable_project() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = init_project(dir.path(), Some("demo"), false).unwrap();
        assert_eq!(outcome.created.len(), 3);
        assert!(dir.path().join("src").join("main.c").is_file());

        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.name, "demo");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.build.output, dir.path().join("build").join("demo.sdkk"));
        assert_eq!(
            config.build.linker_script,
            Some(dir.path().join("linker.ld"))
        );
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("linker.ld"), "custom").unwrap();

        let err = init_project(dir.path(), Some("demo"), false).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists { .. }));
        assert!(!dir.path().join(CONFIG_FILE_NAME).exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("linker.ld")).unwrap(),
            "custom"
        );

        init_project(dir.path(), Some("demo"), true).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("linker.ld")).unwrap(),
            DEFAULT_LINKER_SCRIPT
        );
    }

    #[test]
    fn test_name_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("My App");
        fs::create_dir(&project).unwrap();
        let outcome = init_project(&project, None, false).unwrap();
        assert_eq!(outcome.name, "My-App");
    }

    #[test]
    fn test_name_with_quotes_stays_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let name = r#"my "quoted" \ app"#;
        init_project(dir.path(), Some(name), false).unwrap();

        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.name, name);
        assert_eq!(
            config.build.output,
            dir.path().join("build").join(format!("{}.sdkk", name))
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_project(dir.path(), Some("  "), false).is_err());
    }
}
