//! Driver binary tests: exercise the `rill` subcommands end to end
//! against real files.

use std::io::Write;
use std::process::Command;

fn rill() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rill"))
}

fn source_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".rill")
        .tempfile()
        .expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write source");
    file
}

#[test]
fn run_prints_stack_top_and_memory() {
    let file = source_file("int a = 5 + 2;");
    let output = rill()
        .arg("run")
        .arg(file.path())
        .output()
        .expect("spawn rill");
    assert!(output.status.success(), "run failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(">> stack top: 7"));
    assert!(stdout.contains("a = 7"));
}

#[test]
fn run_with_show_prints_phases() {
    let file = source_file("int a = 1;");
    let output = rill()
        .arg("run")
        .arg(file.path())
        .arg("--show")
        .arg("ir,asm")
        .output()
        .expect("spawn rill");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--- intermediate code ---"));
    assert!(stdout.contains("--- object code ---"));
    assert!(stdout.contains("STORE a"));
}

#[test]
fn check_reports_semantic_errors() {
    let file = source_file("x = 5;");
    let output = rill()
        .arg("check")
        .arg(file.path())
        .output()
        .expect("spawn rill");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("variable 'x' not declared"));
}

#[test]
fn check_accepts_valid_program() {
    let file = source_file("int a = 1; a = a + 1;");
    let output = rill()
        .arg("check")
        .arg(file.path())
        .output()
        .expect("spawn rill");
    assert!(output.status.success());
}

#[test]
fn build_writes_assembly_file() {
    let file = source_file("bool activo = false;");
    let out_dir = tempfile::tempdir().expect("create temp dir");
    let out_path = out_dir.path().join("out.asm");
    let output = rill()
        .arg("build")
        .arg(file.path())
        .arg("-o")
        .arg(&out_path)
        .output()
        .expect("spawn rill");
    assert!(output.status.success());
    let asm = std::fs::read_to_string(&out_path).expect("read listing");
    assert_eq!(asm, "LOAD false\nSTORE activo\n");
}

#[test]
fn embedded_suite_passes() {
    let output = rill().arg("test").output().expect("spawn rill");
    assert!(
        output.status.success(),
        "suite failed: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(", 0 failed"));
}
