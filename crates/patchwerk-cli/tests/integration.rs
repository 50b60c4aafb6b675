//! Integration tests for patchwerk-cli.
//!
//! Tests run the `patchwerk` binary against patch files written to a
//! temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const SUM_PATCH: &str = r#"{
  "objects": [
    { "name": "+", "text": "+ 5", "id": 7 },
    { "name": "print", "text": "print sum", "id": 9, "position": [10, 60] }
  ],
  "links": [ { "from": [7, 0], "to": [9, 0] } ]
}"#;

const DELAY_PATCH: &str = r#"{
  "objects": [
    { "name": "delay", "text": "delay 20", "id": 1 },
    { "name": "print", "text": "print", "id": 2 }
  ],
  "links": [ { "from": [1, 0], "to": [2, 0] } ]
}"#;

/// Helper to get the `patchwerk` binary, isolated from the user's settings.
fn patchwerk_bin(config_home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_patchwerk"));
    command.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    command
}

fn write_patch(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    patchwerk_bin(dir.path())
        .args(args)
        .output()
        .expect("failed to run patchwerk")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// `patchwerk objects`
// ---------------------------------------------------------------------------

#[test]
fn cli_objects_lists_all_types() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["objects"]);
    assert!(output.status.success(), "patchwerk objects failed");

    let stdout = stdout(&output);
    assert!(stdout.contains("Available Objects"));
    for usage in ["+ [right]", "print", "recorder", "send name", "receive name", "delay", "sig~", "*~"] {
        assert!(stdout.contains(usage), "listing should contain '{usage}'");
    }
    assert!(stdout.contains("Messaging"));
}

#[test]
fn cli_objects_details_resolve_aliases() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["objects", "r"]);
    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.starts_with("receive\n"), "got: {stdout}");
    assert!(stdout.contains("Aliases:   r"));
    assert!(stdout.contains("Outlets:   1"));
}

#[test]
fn cli_objects_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["objects", "oscillator"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown node type: oscillator"));
}

// ---------------------------------------------------------------------------
// `patchwerk info`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_shows_nodes_and_links_with_file_ids() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["info", path.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = stdout(&output);
    assert!(stdout.contains("Nodes: 2"));
    assert!(stdout.contains("Links: 1"));
    assert!(stdout.contains("print sum"));
    assert!(stdout.contains("7:0 -> 9:0  (data)"), "got: {stdout}");
}

#[test]
fn cli_info_missing_patch_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["info", "no_such_patch_12345"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn cli_info_refuses_unknown_node_type() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(
        &dir,
        "alien.pwk",
        r#"{ "objects": [ { "name": "oscillator", "id": 1 } ] }"#,
    );
    let output = run(&dir, &["info", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("oscillator"));
}

// ---------------------------------------------------------------------------
// `patchwerk send`
// ---------------------------------------------------------------------------

#[test]
fn cli_send_by_file_id_prints_console() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["send", path.to_str().unwrap(), "7", "0", "3"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("sum: 8"));
}

#[test]
fn cli_send_by_text_and_negative_number() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["send", path.to_str().unwrap(), "+ 5", "0", "-2"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("sum: 3"));
}

#[test]
fn cli_send_reports_unhandled_messages_as_errors() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["send", path.to_str().unwrap(), "7", "0", "hello"]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("doesn't understand"), "got: {stdout}");
}

#[test]
fn cli_send_waits_for_scheduled_output() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "delay.pwk", DELAY_PATCH);
    let output = run(
        &dir,
        &["send", "--wait", "500", path.to_str().unwrap(), "delay", "0", "bang"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("print: bang"));
}

#[test]
fn cli_send_unknown_node_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["send", path.to_str().unwrap(), "42", "0", "1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No node '42'"));
}

// ---------------------------------------------------------------------------
// `patchwerk format`
// ---------------------------------------------------------------------------

#[test]
fn cli_format_writes_canonical_document() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let out = dir.path().join("formatted").join("sum.pwk");
    let output = run(
        &dir,
        &["format", path.to_str().unwrap(), "--output", out.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"ninlets\""));
    assert!(text.contains("\"links\""));

    let runtime = patchwerk_core::Runtime::new();
    patchwerk_registry::install(&runtime);
    let patcher = patchwerk_config::open_patch(&runtime, &out).unwrap();
    assert_eq!(patcher.node_count(), 2);
    assert_eq!(patcher.link_count(), 1);
}

#[test]
fn cli_format_compact_to_stdout() {
    let dir = TempDir::new().unwrap();
    let path = write_patch(&dir, "sum.pwk", SUM_PATCH);
    let output = run(&dir, &["format", path.to_str().unwrap(), "--compact"]);
    assert!(output.status.success());

    let stdout = stdout(&output);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("{\"objects\":"), "got: {stdout}");
}

#[cfg(target_os = "linux")]
#[test]
fn cli_finds_patches_in_user_patches_dir() {
    let dir = TempDir::new().unwrap();
    let patches = dir.path().join("patchwerk").join("patches");
    std::fs::create_dir_all(&patches).unwrap();
    std::fs::write(patches.join("sum.pwk"), SUM_PATCH).unwrap();

    let output = run(&dir, &["info", "sum"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Nodes: 2"));
}
