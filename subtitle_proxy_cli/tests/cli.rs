use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SRT: &str = "1\n00:00:01,000 --> 00:00:04,000\nNever let go, Jack.\n\n2\n00:00:05,500 --> 00:00:07,250\nI'll never let go.\n";

/// The binary with a clean environment and an empty config directory
fn subproxy(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("subproxy").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("NO_COLOR", "1")
        .env_remove("OPENSUBTITLES_USERNAME")
        .env_remove("OPENSUBTITLES_PASSWORD")
        .env_remove("SUBPROXY_REMOTE__ENDPOINT")
        .env_remove("SUBPROXY_REMOTE__USERNAME")
        .env_remove("SUBPROXY_REMOTE__PASSWORD");
    cmd
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("subproxy.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    subproxy(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_convert_file_by_extension() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("titanic.srt");
    fs::write(&input, SRT).unwrap();

    subproxy(&home)
        .arg("convert")
        .arg(&input)
        .args(["--to", "vtt"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000"));
}

#[test]
fn test_convert_stdin_detects_format() {
    let home = TempDir::new().unwrap();
    let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:04.000\nNever let go, Jack.\n";

    subproxy(&home)
        .args(["convert", "-", "--to", "srt"])
        .write_stdin(vtt)
        .assert()
        .success()
        .stdout(predicate::str::contains("00:00:01,000 --> 00:00:04,000"))
        .stdout(predicate::str::contains("WEBVTT").not());
}

#[test]
fn test_convert_writes_output_file() {
    let home = TempDir::new().unwrap();
    let output = home.path().join("out.vtt");

    subproxy(&home)
        .args(["convert", "-", "--from", "srt", "--to", "vtt", "--output"])
        .arg(&output)
        .write_stdin(SRT)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote"));

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with("WEBVTT"));
    assert!(written.contains("00:00:05.500 --> 00:00:07.250"));
}

#[test]
fn test_convert_unknown_input_format_is_misuse() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .args(["convert", "-", "--to", "vtt"])
        .write_stdin("just some text\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--from"));
}

#[test]
fn test_convert_missing_file_is_filesystem_error() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .arg("convert")
        .arg(home.path().join("absent.srt"))
        .args(["--to", "vtt"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("File Error"));
}

#[test]
fn test_search_requires_a_target() {
    let home = TempDir::new().unwrap();

    subproxy(&home).arg("search").assert().code(2);
    subproxy(&home)
        .args(["search", "--imdb-id", "tt0120338", "--query", "titanic"])
        .assert()
        .code(2);
}

#[test]
fn test_config_path_honours_override() {
    let home = TempDir::new().unwrap();
    let path = write_config(&home, "");

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("subproxy.toml"));
}

#[test]
fn test_config_path_defaults_to_config_home() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            home.path().join("subproxy").join("config.toml").to_string_lossy().to_string(),
        ));
}

#[test]
fn test_config_get_layers_file_and_env() {
    let home = TempDir::new().unwrap();
    let path = write_config(
        &home,
        "[remote]\nusername = \"alice\"\npassword = \"secret\"\n\n[service]\nmax_results = 5\n",
    );

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "service.max_results"])
        .assert()
        .success()
        .stdout("5\n");

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .env("OPENSUBTITLES_USERNAME", "bob")
        .args(["config", "get", "remote.username"])
        .assert()
        .success()
        .stdout("bob\n");

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "remote.password"])
        .assert()
        .success()
        .stdout("***\n");
}

#[test]
fn test_config_list_groups_sections() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[cache]"))
        .stdout(predicate::str::contains("[remote]"))
        .stdout(predicate::str::contains("  min_call_interval_ms = 1000"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .arg("--config")
        .arg(home.path().join("absent.toml"))
        .args(["config", "get", "remote.endpoint"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_config_is_rejected_before_remote_calls() {
    let home = TempDir::new().unwrap();
    let path = write_config(&home, "[remote]\nendpoint = \"opensubtitles.org\"\n");

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("remote.endpoint"));
}

#[test]
fn test_status_json_makes_no_remote_call() {
    let home = TempDir::new().unwrap();
    // Nothing listens here; a remote call would fail the command
    let path = write_config(&home, "[remote]\nendpoint = \"http://127.0.0.1:9/xml-rpc\"\n");

    let output = subproxy(&home)
        .arg("--config")
        .arg(&path)
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["endpoint"], "http://127.0.0.1:9/xml-rpc");
    assert_eq!(status["credentials_configured"], false);
    assert_eq!(status["session"]["authenticated"], false);
    assert_eq!(status["supported_formats"], serde_json::json!(["srt", "vtt"]));
}

#[test]
fn test_unreachable_remote_is_upstream_error() {
    let home = TempDir::new().unwrap();
    let path = write_config(
        &home,
        "[remote]\nendpoint = \"http://127.0.0.1:9/xml-rpc\"\nrequest_timeout_secs = 2\n",
    );

    subproxy(&home)
        .arg("--config")
        .arg(&path)
        .args(["status", "--remote"])
        .assert()
        .code(3);
}

#[test]
fn test_completions() {
    let home = TempDir::new().unwrap();

    subproxy(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("subproxy"));
}
