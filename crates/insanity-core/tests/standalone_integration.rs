//! Integration tests for self-driven runs.
//!
//! Each test builds a small test definition, runs it through
//! `Test::run_standalone` and inspects the report and the emitted signals.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use insanity_core::signals::{Signal, SignalSink};
use insanity_core::{HarnessConfig, ItemOutcome, Test, Value};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Signal>>>);

impl SignalSink for Recorder {
    fn emit(&mut self, signal: &Signal) {
        self.0.lock().unwrap().push(signal.clone());
    }
}

fn config(timeout_secs: i64, dir: &tempfile::TempDir) -> HarnessConfig {
    HarnessConfig {
        timeout_secs,
        output_directory: Some(dir.path().to_path_buf()),
        ..HarnessConfig::default()
    }
}

const NO_ARGS: &[&str] = &[];

#[test]
fn passing_item_reports_pass() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("ok-test", "validates ok")
        .checklist_item("ok", "it worked", None, false)
        .unwrap()
        .on_start(|t| {
            t.validate("ok", true, None);
            t.done();
            Ok(())
        })
        .build();

    let report = test
        .run_standalone(NO_ARGS, &config(5, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert_eq!(report.outcomes.get("ok"), Some(&ItemOutcome::Pass));
    assert_eq!(report.failed, 0);
    assert!(report.passed());
    assert!(report.to_string().contains("ok: PASS"));
}

#[test]
fn command_line_argument_overrides_default() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let test = {
        let seen = Arc::clone(&seen);
        Test::builder("arg-test", "reads n")
            .argument("n", "a number", None, false, 5)
            .unwrap()
            .on_start(move |t| {
                *seen.lock().unwrap() = Some(t.argument("n")?);
                t.done();
                Ok(())
            })
            .build()
    };

    test.run_standalone(&["n=7"], &config(5, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(Value::Int32(7)));
}

#[test]
fn unconvertible_command_line_value_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("arg-test", "reads n")
        .argument("n", "a number", None, false, 5)
        .unwrap()
        .build();
    assert!(test
        .run_standalone(&["n=many"], &config(5, &dir), Box::new(Recorder::default()))
        .is_err());
}

#[test]
fn unvalidated_items_are_skipped_and_fail() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("partial", "validates one of two")
        .checklist_item("a", "first", None, false)
        .unwrap()
        .checklist_item("b", "second", None, false)
        .unwrap()
        .on_start(|t| {
            t.validate("a", true, None);
            t.done();
            Ok(())
        })
        .build();

    let report = test
        .run_standalone(NO_ARGS, &config(5, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert_eq!(report.outcomes.get("b"), Some(&ItemOutcome::Skip));
    assert_eq!(report.failed, 1);
    assert_eq!(report.total, 2);
    assert!(report.to_string().ends_with("1/2 failed tests"));
}

#[test]
fn watchdog_expires_without_progress() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("stuck", "never calls done")
        .checklist_item("ok", "never validated", None, false)
        .unwrap()
        .build();

    let started = Instant::now();
    let report = test
        .run_standalone(NO_ARGS, &config(1, &dir), Box::new(Recorder::default()))
        .unwrap();
    let elapsed = started.elapsed();

    assert!(report.timed_out);
    assert!(!report.passed());
    assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "returned after {elapsed:?}");
    assert!(report.to_string().contains("timeout: no progress for 1s"));
}

#[test]
fn pings_keep_a_slow_worker_alive() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("slow", "pings while working")
        .checklist_item("ok", "finished", None, false)
        .unwrap()
        .threaded(|t| {
            for _ in 0..6 {
                std::thread::sleep(Duration::from_millis(300));
                t.ping();
            }
            t.validate("ok", true, None);
            t.done();
        })
        .build();

    let report = test
        .run_standalone(NO_ARGS, &config(1, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert!(!report.timed_out);
    assert!(report.passed());
}

#[test]
fn huge_timeout_runs_without_a_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("patient", "allows forever")
        .checklist_item("ok", "finished", None, false)
        .unwrap()
        .threaded(|t| {
            t.ping();
            t.validate("ok", true, None);
            t.done();
        })
        .build();

    let report = test
        .run_standalone(NO_ARGS, &config(i64::MAX, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert!(!report.timed_out);
    assert!(report.passed());
}

#[test]
fn failing_setup_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let test = Test::builder("nosetup", "setup fails")
        .checklist_item("ok", "never reached", None, false)
        .unwrap()
        .on_setup(|_| anyhow::bail!("missing device"))
        .build();
    let report = test
        .run_standalone(NO_ARGS, &config(5, &dir), Box::new(Recorder::default()))
        .unwrap();
    assert!(!report.passed());
    assert_eq!(report.outcomes.get("ok"), Some(&ItemOutcome::Skip));
}

#[test]
fn synthesized_output_files_are_removed_after_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let test = {
        let seen = Arc::clone(&seen);
        Test::builder("files", "writes output")
            .output_file("dump", "per iteration", false)
            .unwrap()
            .output_file("log", "whole run", true)
            .unwrap()
            .on_start(move |t| {
                let dump = t.output_file("dump")?;
                let log = t.output_file("log")?;
                std::fs::write(&dump, b"data")?;
                seen.lock().unwrap().extend([dump, log]);
                t.done();
                Ok(())
            })
            .build()
    };

    test.run_standalone(NO_ARGS, &config(5, &dir), Box::new(Recorder::default()))
        .unwrap();
    let paths = seen.lock().unwrap().clone();
    assert_eq!(paths.len(), 2);
    assert!(paths[0].ends_with("dump-0"));
    assert!(paths[1].ends_with("log"));
    assert!(paths[0].starts_with(dir.path()));
    for path in &paths {
        assert!(!path.exists(), "{} should be cleaned up", path.display());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn kept_output_files_survive() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(None));
    let test = {
        let seen = Arc::clone(&seen);
        Test::builder("files", "writes output")
            .output_file("dump", "per iteration", false)
            .unwrap()
            .on_start(move |t| {
                *seen.lock().unwrap() = Some(t.output_file("dump")?);
                t.done();
                Ok(())
            })
            .build()
    };
    let cfg = HarnessConfig {
        keep_unnamed_output_files: true,
        ..config(5, &dir)
    };
    test.run_standalone(NO_ARGS, &cfg, Box::new(Recorder::default()))
        .unwrap();
    let path = seen.lock().unwrap().clone().unwrap();
    assert!(path.exists());
}

#[test]
fn console_signals_include_cpu_load() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let test = Test::builder("cpu", "just runs")
        .on_start(|t| {
            t.done();
            Ok(())
        })
        .build();
    test.run_standalone(NO_ARGS, &config(5, &dir), Box::new(recorder.clone()))
        .unwrap();
    let signals = recorder.0.lock().unwrap().clone();
    let loads: Vec<_> = signals
        .iter()
        .filter(|s| matches!(s, Signal::ExtraInfo { label, .. } if label == "cpu-load"))
        .collect();
    assert_eq!(loads.len(), 1);
}
