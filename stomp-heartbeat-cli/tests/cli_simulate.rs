use std::process::{Command, Output};

use tempfile::TempDir;

fn simulate(config_dir: &TempDir, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stomp-heartbeat"))
        .args(["simulate", "--client", "200,200", "--server", "200,200", "--seconds", "1"])
        .args(extra)
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
fn test_simulate_with_answering_peer_stays_healthy() {
    let dir = TempDir::new().unwrap();
    let output = simulate(&dir, &[]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let status = stdout_json(&output);
    assert_eq!(status["send_enabled"], true);
    assert_eq!(status["receive_enabled"], true);
    assert_eq!(status["send_interval_ms"], 200);
    assert_eq!(status["receive_interval_ms"], 200);
    assert!(status["send_count"].as_u64().unwrap() > 0);
    assert!(status["receive_count"].as_u64().unwrap() > 0);
    assert_eq!(status["send_failed"], false);
    assert_eq!(status["receive_failed"], false);
}

#[test]
fn test_simulate_with_silent_peer_flags_receive() {
    let dir = TempDir::new().unwrap();
    let output = simulate(&dir, &["--silent-peer"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let status = stdout_json(&output);
    assert!(status["send_count"].as_u64().unwrap() > 0);
    assert_eq!(status["send_failed"], false);
    assert_eq!(status["receive_failed"], true);
}

#[test]
fn test_simulate_rejects_out_of_range_tolerance() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"heartbeat":{"receive_tolerance":-0.5}}"#,
    )
    .unwrap();

    let output = simulate(&dir, &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("receive_tolerance"), "{stderr}");
}
