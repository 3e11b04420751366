// CLI integration tests for flows that need no live server.
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_folio");
    let mut cmd = Command::new(exe);
    cmd.env_remove("FOLIO_URL").env_remove("FOLIO_TOKEN");
    cmd
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

#[test]
fn completion_generates_script() {
    let output = cmd().args(["completion", "bash"]).output().expect("run");
    assert!(output.status.success());
    let script = String::from_utf8_lossy(&output.stdout);
    assert!(script.contains("folio"));
}

#[test]
fn missing_url_is_usage_error() {
    let output = cmd().args(["dbs"]).output().expect("run");
    assert_eq!(output.status.code().unwrap(), 2);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().last().expect("error line");
    let payload = parse_json(line);
    assert_eq!(payload["error"]["kind"], "Usage");
    assert_eq!(payload["error"]["message"], "no remote url configured");
}

#[test]
fn malformed_filter_is_usage_error() {
    let output = cmd()
        .args([
            "--url",
            "http://127.0.0.1:1",
            "find",
            "shop",
            "orders",
            "--filter",
            "status=open",
        ])
        .output()
        .expect("run");
    assert_eq!(output.status.code().unwrap(), 2);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().last().expect("error line");
    let payload = parse_json(line);
    assert_eq!(payload["error"]["kind"], "Usage");
}

#[test]
fn unreachable_server_is_transport_error() {
    let output = cmd()
        .args(["--url", "http://127.0.0.1:1", "dbs"])
        .output()
        .expect("run");
    assert_eq!(output.status.code().unwrap(), 3);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().last().expect("error line");
    let payload = parse_json(line);
    assert_eq!(payload["error"]["kind"], "Transport");
}
