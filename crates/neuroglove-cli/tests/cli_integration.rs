//! CLI integration tests.
//!
//! These run the built `neuroglove` binary. Nothing here needs a glove or a
//! backend: streaming tests use `--demo`, which wires the session to an
//! in-process mock.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn neuroglove(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_neuroglove"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("NEUROGLOVE_URL")
        .env_remove("NEUROGLOVE_TOKEN")
        .env_remove("NEUROGLOVE_DEVICE")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run neuroglove binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Help and version
// =============================================================================

#[test]
fn test_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(&dir.path().join("config.toml"), &["--help"]);
    assert!(output.status.success());

    let text = stdout(&output);
    for command in ["devices", "register", "history", "connect", "config"] {
        assert!(text.contains(command), "missing {command} in help");
    }
}

#[test]
fn test_version() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(&dir.path().join("config.toml"), &["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_connect_help_lists_modes() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(&dir.path().join("config.toml"), &["connect", "--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--mode"));
    assert!(text.contains("--simulate"));
    assert!(text.contains("--demo"));
}

#[test]
fn test_invalid_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(&dir.path().join("config.toml"), &["calibrate"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_mode_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(
        &dir.path().join("config.toml"),
        &["connect", "--demo", "--mode", "temperature"],
    );
    assert!(!output.status.success());
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn test_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let output = neuroglove(&path, &["config", "path"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), path.display().to_string());
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let output = neuroglove(&path, &["config", "init"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(path.exists());

    let output = neuroglove(&path, &["config", "show"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("url = "));
    assert!(text.contains("mode = \"flex-multi\""));
    assert!(text.contains("simulation = \"auto\""));
}

#[test]
fn test_config_init_refuses_to_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "device = \"left\"\n").unwrap();

    let output = neuroglove(&path, &["config", "init"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("already exists"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "device = \"left\"\n");

    let output = neuroglove(&path, &["config", "init", "--force"]);
    assert!(output.status.success());
    assert!(!fs::read_to_string(&path).unwrap().contains("left"));
}

#[test]
fn test_config_show_redacts_token() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "token = \"super-secret\"\n").unwrap();

    let output = neuroglove(&path, &["config", "show"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(!text.contains("super-secret"));
    assert!(text.contains("<redacted>"));
}

#[test]
fn test_invalid_url_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(
        &dir.path().join("config.toml"),
        &["--url", "localhost:8001", "devices"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Invalid configuration"));
}

// =============================================================================
// Registry reads
// =============================================================================

#[test]
fn test_devices_with_unreachable_backend_shows_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(
        &dir.path().join("config.toml"),
        &["--url", "http://127.0.0.1:1", "devices"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("No devices registered"));
    assert!(stderr(&output).contains("Failed to fetch devices"));
}

#[test]
fn test_devices_json_with_unreachable_backend_is_empty_array() {
    let dir = tempfile::tempdir().unwrap();
    let output = neuroglove(
        &dir.path().join("config.toml"),
        &["--url", "http://127.0.0.1:1", "devices", "--format", "json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value, serde_json::json!([]));
}

// =============================================================================
// Demo streaming
// =============================================================================

fn fast_demo_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "simulation_interval_ms = 50\n").unwrap();
    path
}

#[test]
fn test_demo_connect_streams_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_demo_config(dir.path());

    let output = neuroglove(
        &config,
        &["--quiet", "connect", "--demo", "--count", "3", "--format", "json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["type"], "flex-multi");
        assert_eq!(value["device_id"], "DEMO-NEUROGLOVE");
        for finger in ["thumb", "index", "middle", "ring", "pinky"] {
            assert!(value[finger].as_u64().unwrap() <= 100);
        }
    }
}

#[test]
fn test_demo_connect_battery_text() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_demo_config(dir.path());

    let output = neuroglove(
        &config,
        &["connect", "--demo", "--mode", "battery", "--count", "2"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    assert_eq!(text.lines().count(), 2);
    assert!(text.lines().all(|line| line.contains("BAT ")));
    assert!(stderr(&output).contains("Connected to NeuroGlove Demo (DEMO-NEUROGLOVE)"));
}

#[test]
fn test_demo_connect_simulated_stream() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_demo_config(dir.path());

    let output = neuroglove(
        &config,
        &["connect", "--demo", "--simulate", "always", "--count", "2"],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output).lines().count(), 2);
    assert!(stderr(&output).contains("simulated"));
}
