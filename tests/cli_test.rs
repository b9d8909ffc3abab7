// ABOUTME: CLI-level tests driving the `lox` binary against script files

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn script_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp script file");
    write!(file, "{contents}").expect("failed to write temp script file");
    file
}

#[test]
fn runs_a_script_and_prints_output() {
    let file = script_file("print 1 + 2;\nprint \"hello\";\n");

    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3").and(predicate::str::contains("hello")));
}

#[test]
fn exits_65_on_parse_error() {
    let file = script_file("var = ;\n");

    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg(file.path())
        .assert()
        .code(65);
}

#[test]
fn exits_70_on_runtime_error() {
    let file = script_file("print 1 + \"two\";\n");

    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg(file.path())
        .assert()
        .code(70);
}

#[test]
fn exits_0_on_clean_script() {
    let file = script_file("var x = 1; print x;\n");

    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn exits_65_on_function_with_too_many_parameters() {
    let params = (0..256).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ");
    let file = script_file(&format!("fun f({params}) {{}}\n"));

    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg(file.path())
        .assert()
        .code(65);
}

#[test]
fn missing_script_file_exits_with_io_error() {
    Command::cargo_bin("lox")
        .expect("binary should build")
        .arg("/nonexistent/path/does-not-exist.lox")
        .assert()
        .code(74);
}
