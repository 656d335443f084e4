//! Integration tests for the command-line interface.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const BASE: &str = "class Base {\npublic:\n    ~Base() {}\n    virtual void run() {}\n};\n";
const WORKER: &str = "#include \"base.h\"\nclass Worker : public Base {\npublic:\n    void run() {}\n};\n";

/// A project with one header and one source file.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("base.h"), BASE).unwrap();
    fs::write(dir.path().join("worker.cpp"), WORKER).unwrap();
    fs::write(
        dir.path().join("shapes.cpp"),
        "struct Shape { ~Shape() {} };\nstruct Square : Shape {};\n",
    )
    .unwrap();
    dir
}

fn cpp_refactor(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cpp-refactor"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn fix_rewrites_sources_but_not_headers() {
    let dir = setup_project();

    let output = cpp_refactor(dir.path(), &["fix", "."]);
    assert!(output.status.success(), "{output:?}");

    assert_eq!(
        fs::read_to_string(dir.path().join("worker.cpp")).unwrap(),
        WORKER.replace("void run() {}", "void run() override {}")
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("shapes.cpp")).unwrap(),
        "struct Shape { virtual ~Shape() {} };\nstruct Square : Shape {};\n"
    );
    assert_eq!(fs::read_to_string(dir.path().join("base.h")).unwrap(), BASE);
}

#[test]
fn dry_run_leaves_files_alone() {
    let dir = setup_project();

    let output = cpp_refactor(dir.path(), &["fix", "--dry-run", "--diff", "worker.cpp"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("void run() override {}"));
    assert_eq!(fs::read_to_string(dir.path().join("worker.cpp")).unwrap(), WORKER);
}

#[test]
fn check_fails_while_fixes_are_pending() {
    let dir = setup_project();

    let before = cpp_refactor(dir.path(), &["check", "."]);
    assert_eq!(before.status.code(), Some(1));

    assert!(cpp_refactor(dir.path(), &["fix", "."]).status.success());

    let after = cpp_refactor(dir.path(), &["check", "."]);
    assert!(after.status.success(), "{after:?}");
}

#[test]
fn rule_filter_limits_fixes() {
    let dir = setup_project();

    let output = cpp_refactor(dir.path(), &["fix", "--rule", "missing-override", "."]);
    assert!(output.status.success());

    assert_eq!(
        fs::read_to_string(dir.path().join("shapes.cpp")).unwrap(),
        "struct Shape { ~Shape() {} };\nstruct Square : Shape {};\n"
    );
}

#[test]
fn config_file_disables_rules() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".cpp-refactor.toml"),
        "[rules]\nmissing-override = false\n",
    )
    .unwrap();

    assert!(cpp_refactor(dir.path(), &["fix", "."]).status.success());
    assert_eq!(fs::read_to_string(dir.path().join("worker.cpp")).unwrap(), WORKER);
}

#[test]
fn invalid_config_is_reported() {
    let dir = setup_project();
    fs::write(
        dir.path().join(".cpp-refactor.toml"),
        "[rules]\nvirtual-destrutor = true\n",
    )
    .unwrap();

    let output = cpp_refactor(dir.path(), &["check", "."]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean 'virtual-destructor'?"));
}

#[test]
fn json_format_emits_remarks_and_reports() {
    let dir = setup_project();

    let output = cpp_refactor(dir.path(), &["check", "--format", "json", "shapes.cpp"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["rule"], "virtual-destructor");
    assert_eq!(lines[0]["entity"], "Shape");
    assert_eq!(lines[1]["report"]["applied"], 1);
}

#[test]
fn rules_lists_every_rule() {
    let dir = TempDir::new().unwrap();
    let output = cpp_refactor(dir.path(), &["rules"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["virtual-destructor", "missing-override", "range-loop-reference"] {
        assert!(stdout.contains(id), "missing {id}");
    }
}
