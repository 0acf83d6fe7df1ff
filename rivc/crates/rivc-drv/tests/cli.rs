//! End-to-end tests for the `semantic_pipeline` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write");
    file
}

fn pipeline() -> Command {
    Command::cargo_bin("semantic_pipeline").expect("binary built")
}

#[test]
fn valid_program_exits_zero() {
    let file = write_temp(
        "struct P { x: i32, y: i32 } \
         fn main() { let p = P { y: 2, x: 1 }; printInt(p.x); }",
    );
    pipeline().arg(file.path()).assert().success();
}

#[test]
fn type_error_exits_one_with_diagnostic() {
    let file = write_temp("fn main() {\n    let x: i32 = true;\n}\n");
    pipeline()
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[type]"))
        .stderr(predicate::str::contains(":2:"))
        .stderr(predicate::str::contains("^"));
}

#[test]
fn name_error_reports_identifier() {
    let file = write_temp("fn main() { missing(); }");
    pipeline()
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[name]"))
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn exit_check_failure() {
    let file = write_temp("fn f() { exit(0); } fn main() { f(); }");
    pipeline()
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error[control-flow]"));
}

#[test]
fn missing_file_exits_two() {
    pipeline()
        .arg("/definitely/not/here.rs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn emit_hir_dumps_the_program() {
    let file = write_temp("fn main() { let x: i32 = 7; }");
    pipeline()
        .arg(file.path())
        .arg("--emit-hir")
        .assert()
        .success()
        .stdout(predicate::str::contains("Program"))
        .stdout(predicate::str::contains("funcs"));
}
