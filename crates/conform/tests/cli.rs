mod common;

use std::process::{Command, Output};

use common::{project, write};

const CONFIG: &str = r#"[project]
frontend = "source-tree"

[[layers]]
name = "App"
pattern = "example.com/app"

[[layers]]
name = "Internal"
pattern = "example.com/app/internal/..."

[rules]
best_practices = false

[[rules.dependencies]]
layer = "App"
should_only_refer = ["Internal"]
"#;

const MAIN_WITH_HELPER: &str =
    "package main\n\nimport \"example.com/app/helper\"\n\nfunc main() {\n\thelper.Run()\n}\n";

fn conform(args: &[&str], dir: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_conform"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run conform")
}

fn failing_project() -> tempfile::TempDir {
    let dir = project(&[
        ("main.go", MAIN_WITH_HELPER),
        ("helper/helper.go", "package helper\n\nfunc Run() {}\n"),
        ("internal/store/store.go", "package store\n\nfunc Open() {}\n"),
    ]);
    write(dir.path(), ".conform.toml", CONFIG);
    dir
}

#[test]
fn test_check_fails_on_violations() {
    let dir = failing_project();
    let output = conform(&["check", "."], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(
        output.status.code(),
        Some(1),
        "expected exit code 1 for violations: {stdout}"
    );
    assert!(stdout.contains("CHECK FAILED"), "should say CHECK FAILED: {stdout}");
    assert!(
        stdout.contains("arch violation: <App> is not allowed to refer to <example.com/app/helper>"),
        "should list the violation: {stdout}"
    );
}

#[test]
fn test_check_json_output() {
    let dir = failing_project();
    let output = conform(&["check", ".", "--format", "json"], dir.path());
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["check"]["passed"], false);
    assert_eq!(value["check"]["violation_count"], 1);
    assert_eq!(value["report"]["sections"][0]["category"], "Layer");
}

#[test]
fn test_check_markdown_output() {
    let dir = failing_project();
    let output = conform(&["check", ".", "--format", "markdown"], dir.path());
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "## Architecture violations found\n\
         ### Layer Conventions\n\
         - arch violation: <App> is not allowed to refer to <example.com/app/helper>\n"
    );
}

#[test]
fn test_check_passes() {
    let dir = project(&[
        ("main.go", "package main\n\nimport \"example.com/app/internal/store\"\n\nfunc main() {\n\tstore.Open()\n}\n"),
        ("internal/store/store.go", "package store\n\nfunc Open() {}\n"),
    ]);
    write(dir.path(), ".conform.toml", CONFIG);

    let output = conform(&["check"], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "check should pass: {stdout}");
    assert!(stdout.contains("CHECK PASSED"));
}

#[test]
fn test_check_with_explicit_config() {
    let dir = failing_project();
    let config_dir = tempfile::tempdir().expect("failed to create temp dir");
    write(
        config_dir.path(),
        "custom.toml",
        "[project]\nfrontend = \"source-tree\"\n\n[rules]\nbest_practices = false\n",
    );
    let config = config_dir.path().join("custom.toml");

    let output = conform(
        &["check", ".", "--config", config.to_str().unwrap()],
        dir.path(),
    );
    assert!(output.status.success());
}

#[test]
fn test_unknown_layer_is_an_error() {
    let dir = failing_project();
    write(
        dir.path(),
        ".conform.toml",
        &CONFIG.replace("should_only_refer = [\"Internal\"]", "should_only_refer = [\"Domain\"]"),
    );

    let output = conform(&["check", "."], dir.path());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2));
    assert!(
        stderr.contains("layer 'Domain' is not declared"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_missing_go_mod_is_an_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write(dir.path(), ".conform.toml", CONFIG);

    let output = conform(&["check", "."], dir.path());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("go.mod"), "stderr: {stderr}");
}

#[test]
fn test_packages_lists_layers() {
    let dir = failing_project();
    let output = conform(&["packages", "."], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "packages failed: {stdout}");
    assert!(stdout.contains("example.com/app/internal/store"));
    assert!(stdout.contains("[Internal]"));
    assert!(stdout.contains("example.com/app/helper"));
}

#[test]
fn test_init_creates_config() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let output = conform(&["init"], dir.path());
    assert!(output.status.success(), "init should succeed");

    let content = std::fs::read_to_string(dir.path().join(".conform.toml")).unwrap();
    assert!(content.contains("[project]"));
    assert!(content.contains("[rules]"));

    let again = conform(&["init"], dir.path());
    assert_eq!(again.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    let forced = conform(&["init", "--force"], dir.path());
    assert!(forced.status.success());
}
