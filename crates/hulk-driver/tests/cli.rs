//! Exercises the `hulk-sem-check` binary itself, not just `hulk_driver::seed`
//! — a JSON file on disk in, a process exit code and stderr lines out.

use std::io::Write;
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hulk-sem-check"))
}

fn write_json(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create scratch file");
    file.write_all(json.as_bytes()).expect("write program json");
    file
}

#[test]
fn a_clean_program_exits_ok_with_no_diagnostics() {
    let file = write_json(
        r#"{"decls": [], "expr": {"kind": {"Number": 3.0}, "span": {"start": 0, "end": 0, "line": 0, "column": 0, "file_id": 0}}}"#,
    );
    let output = bin().arg(file.path()).output().expect("run hulk-sem-check");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("ok"));
}

#[test]
fn an_undefined_identifier_exits_with_an_error_and_prints_a_diagnostic() {
    let file = write_json(
        r#"{"decls": [], "expr": {"kind": {"Identifier": {"name": "nope", "is_builtin": false}}, "span": {"start": 0, "end": 0, "line": 0, "column": 0, "file_id": 0}}}"#,
    );
    let output = bin().arg(file.path()).output().expect("run hulk-sem-check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("E5001"));
}

#[test]
fn a_missing_input_file_fails_with_a_readable_error() {
    let output = bin().arg("/no/such/file.json").output().expect("run hulk-sem-check");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}
