//! End-to-end tests for the sdkk CLI
//!
//! These tests verify:
//! - pack → inspect → verify → extract through the binary
//! - Exit codes follow the SDK status codes
//! - JSON output schema for machine consumers
//! - Project scaffolding, dependency listing, highlighting and deploy dry runs
//! - Building a scaffolded project from inside its directory

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn sdkk(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sdkk").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG").arg("--no-color");
    cmd
}

/// Create a directory with a packed `hello.sdkk`
fn create_packed_project() -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("app.bin"), [0xEB, 0xFE]).unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "hello notes").unwrap();

    sdkk(temp_dir.path())
        .args([
            "pack",
            "--name",
            "hello",
            "--version",
            "1.0.0",
            "--description",
            "Demo package",
            "-o",
            "hello.sdkk",
            "app.bin",
            "notes.txt=doc/notes.txt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created hello.sdkk (2 modules"));

    temp_dir
}

#[test]
fn test_version_flag() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sdkk"));
}

#[test]
fn test_inspect_shows_header_and_entries() {
    let project = create_packed_project();
    sdkk(project.path())
        .args(["inspect", "hello.sdkk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package hello 1.0.0"))
        .stdout(predicate::str::contains("Description: Demo package"))
        .stdout(predicate::str::contains("(ok)"))
        .stdout(predicate::str::contains("doc/notes.txt"))
        .stdout(predicate::str::contains("application"));
}

#[test]
fn test_verify_valid_package() {
    let project = create_packed_project();
    sdkk(project.path())
        .args(["verify", "hello.sdkk"])
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("OK hello.sdkk"));
}

#[test]
fn test_verify_corrupted_package_exits_invalid_format() {
    let project = create_packed_project();
    let path = project.path().join("hello.sdkk");
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x55;
    fs::write(&path, bytes).unwrap();

    sdkk(project.path())
        .args(["verify", "hello.sdkk"])
        .assert()
        .code(6)
        .stdout(predicate::str::contains("FAILED hello.sdkk (1 problem)"))
        .stdout(predicate::str::contains("SHA-256 mismatch"));
}

#[test]
fn test_verify_json_output() {
    let project = create_packed_project();
    let output = sdkk(project.path())
        .args(["--json", "verify", "hello.sdkk"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["valid"], true);
    assert!(json["problems"].as_array().unwrap().is_empty());
    assert_eq!(json["computed_sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn test_inspect_json_output() {
    let project = create_packed_project();
    let output = sdkk(project.path())
        .args(["inspect", "hello.sdkk", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["header"]["name"], "hello");
    assert_eq!(json["header"]["entry_count"], 2);
    assert_eq!(json["header"]["data_section_offset"], 1024);
    assert_eq!(json["entries"][0]["name"], "app.bin");
    assert_eq!(json["entries"][0]["flags"][0], "executable");
    assert_eq!(json["entries"][1]["type"], "data");
}

#[test]
fn test_extract_writes_modules() {
    let project = create_packed_project();
    sdkk(project.path())
        .args(["extract", "hello.sdkk", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 modules to out"));

    let out = project.path().join("out");
    assert_eq!(fs::read(out.join("app.bin")).unwrap(), vec![0xEB, 0xFE]);
    assert_eq!(
        fs::read_to_string(out.join("doc").join("notes.txt")).unwrap(),
        "hello notes"
    );
}

#[test]
fn test_missing_package_exits_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .args(["inspect", "nope.sdkk"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_pack_missing_input_exits_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .args(["pack", "--name", "a", "--version", "1.0.0", "ghost.bin"])
        .assert()
        .code(4);
    assert!(!temp_dir.path().join("a.sdkk").exists());
}

#[test]
fn test_pack_unknown_entry_exits_invalid_arg() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("app.bin"), [0x90]).unwrap();
    sdkk(temp_dir.path())
        .args([
            "pack",
            "--name",
            "a",
            "--version",
            "1.0.0",
            "--entry",
            "other.bin",
            "app.bin",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("other.bin"));
}

#[test]
fn test_build_without_config_exits_not_found() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .arg("build")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("sdkk.toml"));
}

#[test]
fn test_init_creates_project_once() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .args(["init", "demo", "--name", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created project 'demo'"));

    let project = temp_dir.path().join("demo");
    assert!(project.join("sdkk.toml").is_file());
    assert!(project.join("linker.ld").is_file());
    assert!(project.join("src").join("main.c").is_file());

    sdkk(temp_dir.path())
        .args(["init", "demo"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("--force"));
}

/// Shell scripts standing in for gcc, ld and objcopy
///
/// Each one fails when an input it is given does not exist relative to its own
/// working directory, which the build pipeline sets to a scratch directory.
#[cfg(unix)]
fn create_fake_toolchain(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    const GCC: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -c) [ -f "$2" ] || { echo "gcc: error: $2: No such file or directory" >&2; exit 1; }; shift ;;
    -I) shift ;;
    -o) out="$2"; shift ;;
  esac
  shift
done
: > "$out"
"#;
    const LD: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -T) [ -f "$2" ] || { echo "ld: cannot open linker script $2" >&2; exit 1; }; shift ;;
    -m|-e) shift ;;
    -o) out="$2"; shift ;;
    *) [ -f "$1" ] || { echo "ld: cannot find $1" >&2; exit 1; } ;;
  esac
  shift
done
: > "$out"
"#;
    const OBJCOPY: &str = r#"#!/bin/sh
[ -f "$3" ] || { echo "objcopy: $3: No such file" >&2; exit 1; }
printf 'raw' > "$4"
"#;

    let bin = dir.join("mingw");
    fs::create_dir_all(&bin).unwrap();
    for (name, script) in [("gcc", GCC), ("ld", LD), ("objcopy", OBJCOPY)] {
        let path = bin.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
    bin
}

#[cfg(unix)]
#[test]
fn test_build_from_project_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    create_fake_toolchain(temp_dir.path());
    sdkk(temp_dir.path())
        .args(["init", "demo"])
        .assert()
        .success();

    let project = temp_dir.path().join("demo");
    sdkk(&project)
        .env_remove("SDKK_TOOLCHAIN_DIR")
        .args(["build", "--toolchain-dir", "../mingw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.sdkk (1 module"));

    let build_dir = project.join("build");
    let leftovers: Vec<_> = fs::read_dir(&build_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("demo.sdkk")]);

    sdkk(&project)
        .args(["verify", "build/demo.sdkk"])
        .assert()
        .success();
    sdkk(&project)
        .args(["extract", "build/demo.sdkk", "out"])
        .assert()
        .success();
    assert_eq!(fs::read(project.join("out").join("main.bin")).unwrap(), b"raw");
}

#[test]
fn test_pack_rejects_names_equal_after_truncation() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("one.bin"), [0x01]).unwrap();
    fs::write(temp_dir.path().join("two.bin"), [0x02]).unwrap();
    let prefix = "p".repeat(70);

    sdkk(temp_dir.path())
        .args(["pack", "--name", "t", "--version", "1.0.0"])
        .arg(format!("one.bin={}/one.bin", prefix))
        .arg(format!("two.bin={}/two.bin", prefix))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("duplicate internal path"));
    assert!(!temp_dir.path().join("t.sdkk").exists());
}

#[test]
fn test_deps_lists_headers_and_modules() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("app.h"), "").unwrap();
    fs::write(
        temp_dir.path().join("main.c"),
        "#include <stdint.h>\n#include \"app.h\"\n#include \"gone.h\"\nvoid f(void) { DRO_MODULE(\"kbd\"); }\n",
    )
    .unwrap();

    sdkk(temp_dir.path())
        .args(["deps", "main.c"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Header: <stdint.h>"))
        .stdout(predicate::str::contains("[system]"))
        .stdout(predicate::str::contains("Header: \"gone.h\"  [missing]"))
        .stdout(predicate::str::contains("Module: kbd  [runtime module]"))
        .stdout(predicate::str::contains("warning: 1 header not found"));
}

#[test]
fn test_deps_uses_project_source() {
    let temp_dir = tempfile::tempdir().unwrap();
    sdkk(temp_dir.path())
        .args(["init", ".", "--name", "demo"])
        .assert()
        .success();

    sdkk(temp_dir.path())
        .arg("deps")
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependencies found."));
}

#[test]
fn test_highlight_plain_and_spans() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = "int main(void) {\n    return 0; // done\n}\n";
    fs::write(temp_dir.path().join("main.c"), source).unwrap();

    sdkk(temp_dir.path())
        .args(["highlight", "main.c"])
        .assert()
        .success()
        .stdout(source);

    sdkk(temp_dir.path())
        .args(["highlight", "main.c", "--spans"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1:0\tkeyword\t\"int\""))
        .stdout(predicate::str::contains("2:4\tkeyword\t\"return\""))
        .stdout(predicate::str::contains("2:14\tcomment\t\"// done\""));
}

#[test]
fn test_deploy_dry_run() {
    let project = create_packed_project();
    fs::write(project.path().join("kernel.elf"), b"\x7fELF").unwrap();
    fs::create_dir(project.path().join("qemu-build")).unwrap();

    sdkk(project.path())
        .args([
            "deploy",
            "hello.sdkk",
            "--kernel",
            "kernel.elf",
            "--build-dir",
            "qemu-build",
            "--memory",
            "64M",
            "--qemu",
            "qemu-test",
            "--dry-run",
            "--",
            "-no-reboot",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "(dry-run) qemu-test -kernel kernel.elf -hda fat:rw:qemu-build -m 64M -serial stdio -no-reboot",
        ));

    assert!(!project.path().join("qemu-build").join("apps").exists());
}

#[test]
fn test_deploy_without_kernel_fails() {
    let project = create_packed_project();
    sdkk(project.path())
        .args(["deploy", "hello.sdkk", "--dry-run"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("deploy.kernel"));
}
