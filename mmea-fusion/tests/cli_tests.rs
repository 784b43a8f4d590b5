//! Integration tests for the mmea-fusion binary
//!
//! Runs the compiled binary against temp files and checks stdout JSON.
//! Every run passes `--config` pointing into the temp dir so the user's
//! real config is never read.

use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mmea-fusion"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run mmea-fusion")
}

#[test]
fn test_fuse_prints_result_json() {
    let temp_dir = TempDir::new().unwrap();
    let session = temp_dir.path().join("session.json");
    std::fs::write(
        &session,
        json!({
            "facial": {"emotion": "happy", "confidence": 0.9, "details": {"happy": 0.9, "neutral": 0.1}},
            "voice": {"emotion": "happy", "confidence": 0.8,
                      "details": {"gender": "female", "happy": 0.8, "calm": 0.2}},
            "text": {"emotion": "joy", "confidence": 0.7, "details": {"joy": 0.7, "neutral": 0.3}}
        })
        .to_string(),
    )
    .unwrap();

    let output = run(
        &temp_dir.path().join("mmea-fusion.toml"),
        &["fuse", session.to_str().unwrap()],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["emotion"], "joy");
    assert_eq!(result["sentiment"], "positive");
    assert_eq!(result["agreement"], 3);
    assert!((result["confidence"].as_f64().unwrap() - 0.95).abs() < 1e-9);
    assert!(result.get("error").is_none());
}

#[test]
fn test_fuse_unreadable_session_reports_error_json() {
    let temp_dir = TempDir::new().unwrap();
    let session = temp_dir.path().join("broken.json");
    std::fs::write(&session, "{ not json").unwrap();

    let output = run(
        &temp_dir.path().join("mmea-fusion.toml"),
        &["fuse", session.to_str().unwrap()],
    );
    assert!(!output.status.success());

    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["emotion"], "neutral");
    assert_eq!(result["confidence"], 0.0);
    assert!(result["error"].is_string());
}

#[test]
fn test_stream_prints_one_line_per_frame() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("mmea-fusion.toml");
    std::fs::write(
        &config,
        "[ensemble]\nface_variants = [{ name = \"standard\", weight = 1.0 }]\n",
    )
    .unwrap();

    let frames = temp_dir.path().join("frames.json");
    std::fs::write(
        &frames,
        json!([
            [{"happy": 0.7, "neutral": 0.3}],
            [{"neutral": 0.4, "happy": 0.6}],
            [{"joy": 1.0}]
        ])
        .to_string(),
    )
    .unwrap();

    let output = run(&config, &["stream", frames.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    // Two estimates (the "joy" frame is not a face label and is skipped)
    // plus the final reading
    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["frame_index"], 0);
    assert_eq!(lines[1]["decision"]["category"], "joy");
    assert_eq!(lines[2]["emotion"], "happy");
    assert_eq!(lines[2]["available"], true);
}

#[test]
fn test_init_config_writes_loadable_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("nested").join("mmea-fusion.toml");

    let output = run(&config, &["init-config"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(config.exists());

    // Refuses to overwrite without --force
    let again = run(&config, &["init-config"]);
    assert!(!again.status.success());
    let forced = run(&config, &["init-config", "--force"]);
    assert!(forced.status.success());
}
