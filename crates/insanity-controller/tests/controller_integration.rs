//! Integration tests for the controller.
//!
//! These tests spawn the `insanity-fixture-test` binary in remote mode and
//! drive it over a real Unix socket.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use insanity_controller::{
    ControllerError, ControllerOptions, NO_TIMEOUT_ITEM, TestController, fetch_metadata,
};
use insanity_core::wire::{ERROR_WRONG_STATE, METHOD_SET_UP};
use insanity_core::{CallArgs, Value, ValueKind, WaitOutcome};

/// Find the path to a fixture binary built alongside the tests.
fn bin_path(name: &str) -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(name);
    path
}

fn fixture_path() -> PathBuf {
    bin_path("insanity-fixture-test")
}

fn mode(mode: &str) -> CallArgs {
    let mut args = CallArgs::default();
    args.arguments.insert("mode".into(), Value::from(mode));
    args
}

async fn spawn() -> TestController {
    TestController::spawn(fixture_path(), ControllerOptions::default())
        .await
        .unwrap()
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn metadata_lists_declarations() {
    let meta = fetch_metadata(fixture_path()).await.unwrap();
    assert_eq!(meta.name, "fixture");
    assert!(meta.checklist.contains_key("ok"));
    assert_eq!(meta.arguments["mode"].kind, ValueKind::String);
    assert_eq!(meta.arguments["mode"].default, Value::from("pass"));
    assert!(meta.extra_infos.contains_key("cpu-load"));
    assert!(!meta.output_files["dump"].global);
}

#[tokio::test]
async fn metadata_of_a_missing_program_is_a_spawn_error() {
    let err = fetch_metadata("/nonexistent/insanity-test").await.unwrap_err();
    assert!(matches!(err, ControllerError::Spawn { .. }));
}

// ─── Full runs ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn passing_run() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.bin");
    let mut args = mode("pass");
    args.output_files.insert("dump".into(), dump.clone());

    let outcome = spawn().await.run(&args, Some(Duration::from_secs(5))).await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.checklist.get("ok"), Some(&true));
    assert_eq!(outcome.checklist.get(NO_TIMEOUT_ITEM), Some(&true));
    assert_eq!(outcome.extra_info.get("mode-seen"), Some(&Value::from("pass")));
    assert!(matches!(outcome.extra_info.get("cpu-load"), Some(Value::Int32(0..=100))));
    assert!(outcome.exit_status.is_some_and(|s| s.success()));
    assert!(outcome.passed());
    assert_eq!(std::fs::read(&dump).unwrap(), b"fixture");
}

#[tokio::test]
async fn test_finishing_inside_start_is_not_a_timeout() {
    let controller = TestController::spawn(bin_path("insanity-fixture-direct"), ControllerOptions::default())
        .await
        .unwrap();
    let started = Instant::now();
    let outcome = controller.run(&CallArgs::default(), Some(Duration::from_secs(3))).await.unwrap();

    assert!(!outcome.timed_out);
    assert_eq!(outcome.checklist.get("ok"), Some(&true));
    assert_eq!(outcome.checklist.get(NO_TIMEOUT_ITEM), Some(&true));
    assert!(outcome.passed());
    assert!(started.elapsed() < Duration::from_secs(3), "waited {:?}", started.elapsed());
}

#[tokio::test]
async fn done_before_the_start_reply_is_kept() {
    let mut controller = TestController::spawn(bin_path("insanity-fixture-direct"), ControllerOptions::default())
        .await
        .unwrap();
    assert!(controller.set_up(&CallArgs::default()).await.unwrap());
    for _ in 0..2 {
        assert!(controller.start(&CallArgs::default()).await.unwrap());
        assert_eq!(
            controller.wait_done(Some(Duration::from_secs(2))).await.unwrap(),
            WaitOutcome::Done
        );
        controller.stop().await.unwrap();
    }
    controller.tear_down().await.unwrap();
    assert_eq!(controller.checklist().get("ok"), Some(&true));
    assert!(controller.wait_exit().await.unwrap().is_some());
}

#[tokio::test]
async fn failing_run() {
    let outcome = spawn()
        .await
        .run(&mode("fail"), Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(outcome.checklist.get("ok"), Some(&false));
    assert!(!outcome.passed());
}

#[tokio::test]
async fn silent_test_times_out() {
    let started = Instant::now();
    let outcome = spawn()
        .await
        .run(&mode("hang"), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(outcome.timed_out);
    assert_eq!(outcome.checklist.get(NO_TIMEOUT_ITEM), Some(&false));
    assert_eq!(outcome.checklist.get("ok"), None);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!outcome.passed());
}

#[tokio::test]
async fn pings_keep_the_run_alive() {
    let outcome = spawn()
        .await
        .run(&mode("slow"), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert!(!outcome.timed_out);
    assert_eq!(outcome.checklist.get("ok"), Some(&true));
}

#[tokio::test]
async fn refused_setup_is_an_error() {
    let err = spawn()
        .await
        .run(&mode("no-setup"), Some(Duration::from_secs(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, ControllerError::Refused { method } if method == METHOD_SET_UP));
}

// ─── Individual calls ────────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_and_introspection() {
    let mut controller = spawn().await;
    assert!(controller
        .service_name()
        .starts_with("net.gstreamer.Insanity.Test.Test"));
    assert!(controller
        .object_path()
        .starts_with("/net/gstreamer/Insanity/Test/Test"));

    let xml = controller.introspect().await.unwrap();
    assert!(xml.contains("remoteStart"));
    assert!(xml.contains(controller.object_path()));

    assert!(controller.set_up(&CallArgs::default()).await.unwrap());
    controller.tear_down().await.unwrap();
    assert!(controller.wait_exit().await.unwrap().is_some());
}

#[tokio::test]
async fn out_of_order_calls_are_rejected() {
    let mut controller = spawn().await;

    let err = controller.stop().await.unwrap_err();
    assert!(matches!(err, ControllerError::Remote { ref name, .. } if name == ERROR_WRONG_STATE));
    assert!(!controller.start(&CallArgs::default()).await.unwrap());

    let mut bad = CallArgs::default();
    bad.arguments.insert("mode".into(), Value::Int32(3));
    assert!(!controller.set_up(&bad).await.unwrap(), "mistyped argument");

    assert!(controller.set_up(&mode("pass")).await.unwrap());
    controller.tear_down().await.unwrap();
    controller.wait_exit().await.unwrap();
}

#[tokio::test]
async fn start_refused_then_torn_down() {
    let mut controller = spawn().await;
    assert!(controller.set_up(&mode("pass")).await.unwrap());
    assert!(controller.start(&mode("pass")).await.unwrap());
    assert!(!controller.start(&mode("pass")).await.unwrap(), "already started");
    assert_eq!(
        controller.wait_done(Some(Duration::from_secs(5))).await.unwrap(),
        WaitOutcome::Done
    );
    controller.stop().await.unwrap();
    controller.tear_down().await.unwrap();
    assert_eq!(controller.checklist().get("ok"), Some(&true));
}
