//! CLI tests for the introspect command
//!
//! Tests that verify argument parsing and the end-to-end behavior of each
//! command against temporary header trees.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the introspect binary
#[allow(deprecated)]
fn introspect() -> Command {
    let mut cmd = Command::cargo_bin("introspect").expect("Failed to find introspect binary");
    // Keep any real global config out of the tests.
    cmd.env("HOME", std::env::temp_dir().join("introspect-cli-tests-home"));
    cmd.env_remove("INTROSPECT_CONFIG");
    cmd
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "include/color.h",
        "namespace gfx {\nENUM_META\nenum class Color : unsigned char { Red, Green, Blue };\n}\n",
    );
    write(
        temp.path(),
        "include/widget.hpp",
        "struct Base {};\nCLASS_META\nclass Widget final : public Base {};\n",
    );
    temp
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_shows_all_commands() {
    introspect()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("dump"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_version_flag() {
    introspect()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("introspect"));
}

#[test]
fn test_global_options_in_help() {
    introspect()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--quiet"));
}

#[test]
fn test_generate_help_lists_options() {
    introspect()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--filename"))
        .stdout(predicate::str::contains("--emit"))
        .stdout(predicate::str::contains("--tagged-only"))
        .stdout(predicate::str::contains("--exclude-type"))
        .stdout(predicate::str::contains("--no-cache"))
        .stdout(predicate::str::contains("--jobs"));
}

#[test]
fn test_unknown_command_fails() {
    introspect().arg("frobnicate").assert().failure();
}

#[test]
fn test_dump_requires_file() {
    introspect().arg("dump").assert().failure();
}

// ============================================================================
// Generate Command Tests
// ============================================================================

#[test]
fn test_generate_writes_output_files() {
    let temp = sample_tree();
    let out = temp.path().join("generated");

    introspect()
        .arg("--quiet")
        .arg("generate")
        .arg(temp.path())
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let header = fs::read_to_string(out.join("metadata.h")).unwrap();
    assert!(header.contains("EnumTrait<gfx::Color>"));
    assert!(header.contains("ClassTrait<Widget>"));
    assert!(header.contains("ClassTrait<Base>"));
    assert!(out.join("metadata.cpp").exists());
    assert!(temp.path().join(".introspect-cache").join("index.json").exists());
}

#[test]
fn test_generate_respects_filters() {
    let temp = sample_tree();

    introspect()
        .args(["--quiet", "generate"])
        .arg(temp.path())
        .args(["--filename", "reflect", "--emit", "classes", "--tagged-only", "--no-cache"])
        .assert()
        .success();

    let header = fs::read_to_string(temp.path().join("reflect.h")).unwrap();
    assert!(header.contains("ClassTrait<Widget>"));
    assert!(!header.contains("ClassTrait<Base>"));
    assert!(!header.contains("EnumTrait<"));
    assert!(!temp.path().join(".introspect-cache").exists());
}

#[test]
fn test_generate_does_not_read_its_own_output() {
    let temp = sample_tree();

    for _ in 0..2 {
        introspect()
            .args(["--quiet", "generate"])
            .arg(temp.path())
            .assert()
            .success();
    }

    assert!(temp.path().join("metadata.h").exists());
    let index =
        fs::read_to_string(temp.path().join(".introspect-cache").join("index.json")).unwrap();
    assert!(index.contains("color.h"));
    assert!(!index.contains("metadata.h"));
}

#[test]
fn test_parse_errors_do_not_fail_generate() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "broken.h", "enum Broken { A }\n");
    write(temp.path(), "ok.h", "enum Fine { B };\n");

    introspect()
        .args(["--quiet", "generate"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("broken.h:"))
        .stderr(predicate::str::contains("error[UNEXPECTED_SYMBOL]"));

    let header = fs::read_to_string(temp.path().join("metadata.h")).unwrap();
    assert!(header.contains("EnumTrait<Fine>"));
}

#[test]
fn test_generate_missing_input_fails() {
    let temp = TempDir::new().unwrap();

    introspect()
        .arg("generate")
        .arg(temp.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to discover headers"));
}

#[test]
fn test_invalid_config_fails() {
    let temp = sample_tree();
    write(temp.path(), "introspect.toml", "[output]\nexclude_types = [\"(\"]\n");

    introspect()
        .arg("generate")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_explicit_config_file() {
    let temp = sample_tree();
    let config = temp.path().join("custom.toml");
    fs::write(&config, "[output]\nfilename = \"from_config\"\n").unwrap();

    introspect()
        .arg("--quiet")
        .arg("--config")
        .arg(&config)
        .arg("generate")
        .arg(temp.path())
        .assert()
        .success();

    assert!(temp.path().join("from_config.h").exists());
}

#[test]
fn test_bad_emit_value_fails() {
    let temp = sample_tree();

    introspect()
        .arg("generate")
        .arg(temp.path())
        .args(["--emit", "unions"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unions"));
}

// ============================================================================
// Dump Command Tests
// ============================================================================

#[test]
fn test_dump_prints_tree() {
    let temp = sample_tree();

    introspect()
        .args(["--quiet", "dump"])
        .arg(temp.path().join("include/color.h"))
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace gfx"))
        .stdout(predicate::str::contains(
            "enum class Color : unsigned char { Red, Green, Blue }",
        ));
}

#[test]
fn test_dump_json() {
    let temp = sample_tree();

    let output = introspect()
        .args(["--quiet", "dump", "--json"])
        .arg(temp.path().join("include/widget.hpp"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let widget = &value["table"]["global"]["named"]["Widget"]["type"];
    assert_eq!(widget["kind"], "class");
    assert_eq!(widget["is_final"], true);
    assert_eq!(value["diagnostics"].as_array().unwrap().len(), 0);
}

#[test]
fn test_dump_missing_file_fails() {
    let temp = TempDir::new().unwrap();

    introspect()
        .arg("dump")
        .arg(temp.path().join("missing.h"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

// ============================================================================
// Clean Command Tests
// ============================================================================

#[test]
fn test_clean_removes_cache() {
    let temp = sample_tree();
    let cache = temp.path().join(".introspect-cache");

    introspect()
        .args(["--quiet", "generate"])
        .arg(temp.path())
        .assert()
        .success();
    assert!(cache.exists());

    introspect()
        .args(["clean", "--dry-run"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("would remove"));
    assert!(cache.exists());

    introspect()
        .args(["--quiet", "clean"])
        .arg(temp.path())
        .assert()
        .success();
    assert!(!cache.exists());

    introspect()
        .arg("clean")
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("No cache"));
}
