use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub fn path_to_test_resource(name: &'static str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("resources");
    path.push(name);
    path
}

fn generate(gen_dir: &Path, input: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("cddlgen"));
    cmd.arg("--header")
        .arg("msgs/messages.h")
        .arg("--cc")
        .arg("msgs/messages.cc")
        .arg("--gen-dir")
        .arg(gen_dir)
        .arg(input);
    cmd
}

#[test]
fn generate_when_no_args_then_usage() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("cddlgen"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));

    Ok(())
}

#[test]
fn generate_when_help_then_ok() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo::cargo_bin!("cddlgen"));

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--gen-dir"));

    Ok(())
}

#[test]
fn generate_when_header_repeated_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("entry.cddl"));

    cmd.arg("--header").arg("other.h");
    cmd.assert().code(1);
    assert!(!dir.path().join("msgs").exists());

    Ok(())
}

#[test]
fn generate_when_entry_then_writes_struct() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("entry.cddl"));

    cmd.assert().success();

    let header = fs::read_to_string(dir.path().join("msgs/messages.h"))?;
    let source = fs::read_to_string(dir.path().join("msgs/messages.cc"))?;
    assert!(header.contains("struct Entry {"));
    assert!(header.contains("uint64_t a;"));
    assert!(header.contains("std::string b;"));
    assert!(header.contains("#ifndef MSGS_MESSAGES_H_"));
    assert!(source.contains("#include \"msgs/messages.h\""));
    assert!(source.contains("bool EncodeEntry(const Entry& data, CborEncoder* encoder)"));

    Ok(())
}

#[test]
fn generate_when_schema_has_messages_then_ok() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("messages.cddl"));

    cmd.assert().success();

    let header = fs::read_to_string(dir.path().join("msgs/messages.h"))?;
    assert!(header.contains("enum class Type : uint64_t"));
    assert!(header.contains("struct AgentInfoResponse {"));
    assert!(header.contains("enum class Result : uint64_t"));
    assert!(header.contains("using Value = std::variant<"));
    assert!(header.contains("bool PeekMessageType("));

    Ok(())
}

#[test]
fn generate_when_custom_namespace_then_ok() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("entry.cddl"));

    cmd.arg("--namespace").arg("openscreen::msgs");
    cmd.assert().success();

    let header = fs::read_to_string(dir.path().join("msgs/messages.h"))?;
    assert!(header.contains("namespace openscreen::msgs {"));

    Ok(())
}

#[test]
fn generate_when_unresolved_reference_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("unresolved.cddl"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("unresolved reference to 'foo'"));
    assert!(!dir.path().join("msgs/messages.h").exists());
    assert!(!dir.path().join("msgs/messages.cc").exists());

    Ok(())
}

#[test]
fn generate_when_duplicate_tag_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("duplicate_tag.cddl"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate discriminant 3"));
    assert!(!dir.path().join("msgs/messages.h").exists());
    assert!(!dir.path().join("msgs/messages.cc").exists());

    Ok(())
}

#[test]
fn generate_when_type_key_collision_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("type_key_collision.cddl"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate discriminant 10"));
    assert!(!dir.path().join("msgs/messages.h").exists());

    Ok(())
}

#[test]
fn generate_when_syntax_error_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("syntax_error.cddl"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("parse error"));

    Ok(())
}

#[test]
fn generate_when_not_a_file_then_err() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), Path::new("test/file/doesnt/exist.cddl"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read"));

    Ok(())
}

#[test]
fn generate_when_verbose_then_logs_progress() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mut cmd = generate(dir.path(), &path_to_test_resource("entry.cddl"));

    cmd.arg("-v").env_remove("RUST_LOG");
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("resolved 1 types"));

    Ok(())
}

#[test]
fn generate_when_run_twice_then_identical_output() -> Result<(), Box<dyn std::error::Error>> {
    let first = TempDir::new()?;
    let second = TempDir::new()?;
    let input = path_to_test_resource("messages.cddl");

    generate(first.path(), &input).assert().success();
    generate(second.path(), &input).assert().success();

    for file in ["msgs/messages.h", "msgs/messages.cc"] {
        let a = fs::read(first.path().join(file))?;
        let b = fs::read(second.path().join(file))?;
        assert_eq!(a, b, "{file} differs between runs");
    }

    Ok(())
}
