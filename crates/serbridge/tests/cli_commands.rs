#![cfg(all(unix, feature = "cli"))]

use std::process::{Command, Output, Stdio};

fn serbridge(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serbridge"))
        .env_remove("SERBRIDGE_CONFIG")
        .args(["--log-level", "error"])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("serbridge should run")
}

#[test]
fn version_prints_package_version() {
    let output = serbridge(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("serbridge {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_lists_features() {
    let output = serbridge(&["version", "--extended"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: serbridge"));
    assert!(stdout.contains("cli=true"));
}

#[test]
fn unknown_subcommand_is_usage_error() {
    let output = serbridge(&["reboot"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn ports_emits_json_list() {
    let output = serbridge(&["--format", "json", "ports"]);

    // Enumeration itself may be unavailable in minimal sandboxes.
    if output.status.code() == Some(3) {
        return;
    }
    assert!(output.status.success());
    let ports: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("ports should emit json");
    assert!(ports.is_array());
}

#[test]
fn discover_without_device_exits_1() {
    let output = serbridge(&["--format", "json", "discover", "--timeout", "50ms"]);

    if output.status.code() == Some(3) {
        return;
    }
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("discover should emit json");
    assert_eq!(result["found"], false);
    assert!(result.get("port").is_none());
}

#[test]
fn send_to_missing_port_is_transport_error() {
    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    let missing = dir.path().join("ttyMISSING0");
    let missing = missing.to_str().expect("temp path should be utf-8");

    let output = serbridge(&["send", "raw", "-s", "hello", "--port", missing]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("open failed"));
}

#[test]
fn ping_to_missing_port_is_transport_error() {
    let dir = tempfile::tempdir().expect("temp dir should be creatable");
    let missing = dir.path().join("ttyMISSING0");
    let missing = missing.to_str().expect("temp path should be utf-8");

    let output = serbridge(&["ping", "--port", missing]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn send_rejects_bad_command_before_opening_port() {
    let output = serbridge(&["send", "0x10000", "-s", "x", "--port", "/dev/null-port"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("out of range"));
}

#[test]
fn send_rejects_bad_hex() {
    let output = serbridge(&["send", "raw", "-x", "01 0", "--port", "/dev/null-port"]);
    assert_eq!(output.status.code(), Some(64));
}
