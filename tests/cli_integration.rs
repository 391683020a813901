use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const DAILY_LOG: &str = "timestamp,temperature,humidity,unix_timestamp
2025-06-01 12:00:00,22.8,63.5,1748772000
2025-06-01 12:01:00,23.1,64.2,1748772060
";

const SNAPSHOT: &str = "Last Updated: 2025-06-01 12:01:00
Temperature: 23.1°C
Humidity: 64.2%
Unix Timestamp: 1748772060
";

fn klimakammer(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("klimakammer").unwrap();
    cmd.env("KLIMA_HOME", home)
        .env_remove("OPENAI_API_KEY")
        .env_remove("DATAFORDELER_NO_CERT_USERNAME")
        .env_remove("DATAFORDELER_NO_CERT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version() {
    let mut cmd = Command::cargo_bin("klimakammer").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("klimakammer "));
}

#[test]
fn test_init_creates_layout() {
    let temp_dir = tempfile::tempdir().unwrap();
    let home = temp_dir.path().join("sensordata");

    klimakammer(&home)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Data directory ready"));

    assert!(home.join("daily").is_dir());
    assert!(home.join("analyses").is_dir());
    assert!(home.join("config.json").is_file());
}

#[test]
fn test_status_on_empty_data_dir() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No current reading yet"))
        .stdout(predicate::str::contains("No daily logs yet."));
}

#[test]
fn test_status_shows_snapshot_and_daily_logs() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("daily")).unwrap();
    fs::write(temp_dir.path().join("daily/2025-06-01.csv"), DAILY_LOG).unwrap();
    fs::write(temp_dir.path().join("current_reading.txt"), SNAPSHOT).unwrap();

    klimakammer(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("23.1°C"))
        .stdout(predicate::str::contains("2025-06-01").and(predicate::str::contains("2 readings")));
}

#[test]
fn test_advise_without_readings_reports_no_data() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .args(["advise", "current"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No data available"));

    assert!(!temp_dir.path().join("analyses/latest_analysis.txt").exists());
}

#[test]
fn test_advise_without_api_key_names_the_variable() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("current_reading.txt"), SNAPSHOT).unwrap();

    klimakammer(temp_dir.path())
        .args(["advise", "current"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_trend_rejects_zero_days() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .args(["advise", "trend", "--days", "0"])
        .assert()
        .failure();
}

#[test]
fn test_doctor_rebuilds_snapshot_from_daily_logs() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp_dir.path().join("daily")).unwrap();
    fs::write(temp_dir.path().join("daily/2025-06-01.csv"), DAILY_LOG).unwrap();

    klimakammer(temp_dir.path())
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("(2 entries)"));

    let snapshot = fs::read_to_string(temp_dir.path().join("current_reading.txt")).unwrap();
    assert!(snapshot.contains("Temperature: 23.1°C"));
    let window = fs::read_to_string(temp_dir.path().join("latest_readings.txt")).unwrap();
    assert_eq!(window.lines().filter(|l| !l.starts_with('#')).count(), 2);
}

#[test]
fn test_config_set_and_get() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .args(["config", "interval_secs", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("interval_secs set to 30"));

    klimakammer(temp_dir.path())
        .args(["config", "interval_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30"));

    klimakammer(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("interval_secs = 30"))
        .stdout(predicate::str::contains("model = gpt-4"));
}

#[test]
fn test_config_rejects_invalid_value() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .args(["config", "baud_rate", "fast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid value for baud_rate"));

    assert!(!temp_dir.path().join("config.json").exists());
}

#[test]
fn test_history_and_latest_when_empty() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No analyses archived yet."));

    klimakammer(temp_dir.path())
        .arg("latest")
        .assert()
        .success()
        .stdout(predicate::str::contains("No analyses archived yet."));
}

#[test]
fn test_read_from_missing_port_fails_with_hint() {
    let temp_dir = tempfile::tempdir().unwrap();
    let port = temp_dir.path().join("no-such-tty");

    klimakammer(temp_dir.path())
        .args(["read", "--port", port.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Serial port error"))
        .stderr(predicate::str::contains("serial_port"));

    assert!(!temp_dir.path().join("current_reading.txt").exists());
}

#[test]
fn test_building_without_credentials_warns() {
    let temp_dir = tempfile::tempdir().unwrap();

    klimakammer(temp_dir.path())
        .args(["building", "Marievej", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Building registry is not configured"));
}

#[test]
fn test_data_dir_flag_overrides_env() {
    let env_home = tempfile::tempdir().unwrap();
    let flag_home = tempfile::tempdir().unwrap();

    klimakammer(env_home.path())
        .args(["--data-dir", flag_home.path().to_str().unwrap(), "init"])
        .assert()
        .success();

    assert!(flag_home.path().join("config.json").exists());
    assert!(!env_home.path().join("config.json").exists());
}
