use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prtriage"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "prtriage init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".prtriage.toml");
    assert!(config_path.exists(), ".prtriage.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[team]"));
    assert!(content.contains("[nightly]"));

    // Every option is commented out, so parsing yields the defaults
    let config: prtriage_core::TriageConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.github.organization, "PrestaShop");
    assert_eq!(config.team.quota, 5);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".prtriage.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prtriage"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".prtriage.toml")).unwrap();
    assert_eq!(content, "# existing");
}

#[test]
fn missing_explicit_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prtriage"))
        .args(["report", "--config", "absent.toml"])
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("file not found"), "stderr: {stderr}");
    assert!(stderr.contains("absent.toml"));
}

#[test]
fn notify_without_qa_channel_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prtriage"))
        .args(["notify", "--github-token", "ghp_test", "--slack-token", "xoxb-test"])
        .env_remove("SLACK_CHANNEL_QA")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No QA channel configured"));
}
