//! Unit tests for configuration parsing and validation.

use std::io::Write as _;
use std::time::Duration;

use juggler::{AppError, GlobalConfig};

#[test]
fn empty_toml_yields_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("empty config parses");

    assert_eq!(config.listener_cmd, "nc");
    assert_eq!(config.listener_args, vec!["-l", "-p", "{port}"]);
    assert_eq!(config.response_window_ms, 500);
    assert_eq!(config.stop_grace_ms, 3000);
    assert_eq!(config.queue_capacity, 1024);
}

#[test]
fn fields_override_defaults() {
    let toml = r#"
listener_cmd = "ncat"
listener_args = ["--listen", "{port}"]
response_window_ms = 250
stop_grace_ms = 1000
queue_capacity = 16
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("config parses");

    assert_eq!(config.listener_cmd, "ncat");
    assert_eq!(config.listener_args, vec!["--listen", "{port}"]);
    assert_eq!(config.response_window(), Duration::from_millis(250));
    assert_eq!(config.stop_grace(), Duration::from_millis(1000));
    assert_eq!(config.queue_capacity, 16);
}

#[test]
fn load_reads_a_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "listener_cmd = \"ncat\"").expect("write config");

    let config = GlobalConfig::load(file.path()).expect("config loads");
    assert_eq!(config.listener_cmd, "ncat");
}

#[test]
fn load_reports_a_missing_file() {
    let err = GlobalConfig::load(std::path::Path::new("/nonexistent/juggler.toml"))
        .expect_err("missing file is an error");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn empty_listener_cmd_is_rejected() {
    let err = GlobalConfig::from_toml_str("listener_cmd = \" \"")
        .expect_err("blank listener_cmd is invalid");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn zero_queue_capacity_is_rejected() {
    let err =
        GlobalConfig::from_toml_str("queue_capacity = 0").expect_err("zero capacity is invalid");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn malformed_toml_is_rejected() {
    let err = GlobalConfig::from_toml_str("listener_cmd = [").expect_err("bad toml is an error");
    assert!(matches!(err, AppError::Config(_)));
}

#[test]
fn port_placeholder_is_substituted() {
    let config = GlobalConfig::default();
    assert_eq!(config.listener_args_for(9000), vec!["-l", "-p", "9000"]);
}

#[test]
fn args_without_placeholder_are_untouched() {
    let toml = r#"listener_args = ["-c", "cat"]"#;
    let config = GlobalConfig::from_toml_str(toml).expect("config parses");
    assert_eq!(config.listener_args_for(9000), vec!["-c", "cat"]);
}
