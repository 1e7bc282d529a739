//! Integration tests for the session registry.
//!
//! Ports key the sessions; the substituted `cat` listener ignores them, so
//! every test can pick arbitrary distinct port numbers.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use juggler::session::SessionRegistry;
use juggler::{AppError, GlobalConfig};

fn test_config(cmd: &str, args: &[&str]) -> GlobalConfig {
    GlobalConfig {
        listener_cmd: cmd.into(),
        listener_args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        response_window_ms: 500,
        stop_grace_ms: 2000,
        queue_capacity: 64,
    }
}

fn cat_registry() -> SessionRegistry {
    SessionRegistry::new(Arc::new(test_config("cat", &[])))
}

#[tokio::test]
async fn add_then_list_contains_the_port_once() {
    let mut registry = cat_registry();
    registry.add(9000).await.expect("add");

    assert_eq!(registry.list(), vec![9000]);

    registry.stop_all().await;
}

#[tokio::test]
async fn duplicate_add_is_reported_and_keeps_one_session() {
    let mut registry = cat_registry();
    registry.add(9001).await.expect("first add");

    let err = registry.add(9001).await.expect_err("second add must fail");
    assert!(matches!(err, AppError::DuplicateSession(9001)));
    assert_eq!(registry.list(), vec![9001]);

    registry.stop_all().await;
}

#[tokio::test]
async fn remove_of_an_unknown_port_changes_nothing() {
    let mut registry = cat_registry();
    registry.add(9002).await.expect("add");
    registry.select(9002).expect("select");

    let err = registry.remove(4444).await.expect_err("remove must fail");
    assert!(matches!(err, AppError::UnknownSession(4444)));
    assert_eq!(registry.list(), vec![9002]);
    assert_eq!(registry.selected(), Some(9002));

    registry.stop_all().await;
}

#[tokio::test]
async fn select_of_an_unknown_port_leaves_selection_unchanged() {
    let mut registry = cat_registry();
    registry.add(9003).await.expect("add");
    registry.select(9003).expect("select");

    let err = registry.select(4444).expect_err("select must fail");
    assert!(matches!(err, AppError::UnknownSession(4444)));
    assert_eq!(registry.selected(), Some(9003));

    registry.stop_all().await;
}

#[tokio::test]
async fn removing_the_selected_session_clears_selection() {
    let mut registry = cat_registry();
    registry.add(9004).await.expect("add");
    registry.select(9004).expect("select");

    registry.remove(9004).await.expect("remove");
    assert_eq!(registry.selected(), None);
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn send_without_a_selection_is_reported() {
    let mut registry = cat_registry();
    registry.add(9005).await.expect("add");

    let err = registry
        .send_command("echo hi")
        .await
        .expect_err("send must fail");
    assert!(matches!(err, AppError::NoSelection));

    registry.stop_all().await;
}

#[tokio::test]
#[serial]
async fn send_command_returns_the_echoed_response() {
    let mut registry = cat_registry();
    registry.add(9006).await.expect("add");
    registry.select(9006).expect("select");

    let response = registry.send_command("echo hi").await.expect("send");
    assert_eq!(response, "echo hi");
    assert_eq!(
        registry.selected(),
        Some(9006),
        "a successful send leaves the selection in place"
    );

    registry.stop_all().await;
}

#[tokio::test]
#[serial]
async fn slow_responses_surface_in_a_later_drain() {
    let mut config = test_config("sh", &["-c", r#"read line; sleep 1; printf '%s\n' "$line""#]);
    config.response_window_ms = 100;
    let mut registry = SessionRegistry::new(Arc::new(config));

    registry.add(9007).await.expect("add");
    registry.select(9007).expect("select");

    let within_window = registry.send_command("slow one").await.expect("send");
    assert_eq!(within_window, "", "peer must be slower than the window");

    tokio::time::sleep(Duration::from_secs(2)).await;
    let caught_up = registry.drain_selected().await.expect("late output queued");
    assert_eq!(caught_up, (9007, "slow one".to_owned()));

    registry.stop_all().await;
}

#[tokio::test]
#[serial]
async fn stale_session_is_evicted_on_re_add() {
    // `true` exits immediately, leaving a dead entry keyed on the port.
    let mut registry = SessionRegistry::new(Arc::new(test_config("true", &[])));
    registry.add(9008).await.expect("first add");
    tokio::time::sleep(Duration::from_millis(300)).await;

    registry
        .add(9008)
        .await
        .expect("dead entry must not block re-adding the port");
    assert_eq!(registry.list(), vec![9008]);

    registry.stop_all().await;
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn eviction_is_not_rolled_back_when_the_respawn_fails() {
    use std::os::unix::fs::PermissionsExt as _;

    // A listener script that exits immediately, then disappears before
    // the port is re-added: the stale entry is evicted, the new spawn
    // fails, and the dead entry stays gone.
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("short-lived-listener.sh");
    std::fs::write(&script, "#!/bin/sh\nexit 0\n").expect("write script");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("chmod script");

    let script_path = script.to_str().expect("utf8 path").to_owned();
    let mut registry = SessionRegistry::new(Arc::new(test_config(&script_path, &[])));
    registry.add(9011).await.expect("first add");
    registry.select(9011).expect("select");
    tokio::time::sleep(Duration::from_millis(300)).await;

    std::fs::remove_file(&script).expect("remove script");
    let err = registry.add(9011).await.expect_err("respawn must fail");
    assert!(matches!(err, AppError::Spawn(_)));
    assert!(registry.list().is_empty(), "stale entry must stay evicted");
    assert_eq!(registry.selected(), None, "selection must stay cleared");

    registry.stop_all().await;
}

#[tokio::test]
#[serial]
async fn stop_all_empties_the_registry_and_is_idempotent() {
    let mut registry = cat_registry();
    registry.add(9009).await.expect("add");
    registry.add(9010).await.expect("add");
    registry.select(9010).expect("select");

    registry.stop_all().await;
    assert!(registry.list().is_empty());
    assert_eq!(registry.selected(), None);

    // A second pass over an empty registry is a no-op.
    registry.stop_all().await;
    assert!(registry.list().is_empty());
}
