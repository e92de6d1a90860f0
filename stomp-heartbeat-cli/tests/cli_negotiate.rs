use std::process::{Command, Output};

use tempfile::TempDir;

fn run(config_dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stomp-heartbeat"))
        .args(args)
        .arg("--config-dir")
        .arg(config_dir.path())
        .env("RUST_LOG", "off")
        .env(
            "STOMP_HEARTBEAT__LOGGING__DIR",
            config_dir.path().join("logs"),
        )
        .output()
        .expect("Failed to run stomp-heartbeat")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({e}):\n{stdout}"))
}

#[test]
fn test_negotiate_receive_only() {
    let dir = TempDir::new().unwrap();
    let output = run(
        &dir,
        &["negotiate", "--client", "1000,2000", "--server", "3000,0"],
    );
    assert!(output.status.success());

    let outcome = stdout_json(&output);
    assert_eq!(outcome["outcome"], "enabled");
    assert!(outcome["send_interval_ms"].is_null());
    assert_eq!(outcome["receive_interval_ms"], 3000);
}

#[test]
fn test_negotiate_disabled_by_client() {
    let dir = TempDir::new().unwrap();
    let output = run(
        &dir,
        &["negotiate", "--client", "0,0", "--server", "5000,5000"],
    );
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["outcome"], "disabled");
}

#[test]
fn test_negotiate_malformed_header_fails() {
    let dir = TempDir::new().unwrap();
    let output = run(
        &dir,
        &["negotiate", "--client", "abc,100", "--server", "5000,5000"],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("non-numeric client heart-beat x value"), "{stderr}");
}

#[test]
fn test_negotiate_uses_configured_client_header() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"heartbeat":{"client_heart_beat":"750,0"}}"#,
    )
    .unwrap();

    let output = run(&dir, &["negotiate", "--server", "0,500"]);
    assert!(output.status.success());
    let outcome = stdout_json(&output);
    assert_eq!(outcome["send_interval_ms"], 750);
    assert!(outcome["receive_interval_ms"].is_null());
}
