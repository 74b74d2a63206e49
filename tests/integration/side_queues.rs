//! Integration tests for background side queues

use super::support::{record_command, toks, CallLog};
use gantry::capability::{Command, ParameterSchema};
use gantry::side::SideState;
use gantry::Engine;
use serde_json::{json, Value};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn queues(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// `hold` blocks on `gate` twice: once to signal it started, once to finish.
fn hold_command(gate: Arc<Barrier>) -> Command {
    Command::new("hold", ParameterSchema::new(), move |_| {
        gate.wait();
        gate.wait();
        Ok(Value::Null.into())
    })
}

#[test]
fn test_same_queue_runs_in_enqueue_order() {
    let log = CallLog::default();
    let engine = Engine::builder().with_command(record_command(&log)).build();

    for label in ["a", "b", "c", "d", "e"] {
        engine.enqueue_side(&queues(&["jobs:"]), &toks(&format!("record {}", label)), None);
    }

    assert!(engine.side().wait_idle(WAIT));
    assert_eq!(log.entries(), vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn test_two_queue_command_waits_for_both_heads() {
    let log = CallLog::default();
    let gate = Arc::new(Barrier::new(2));
    let engine = Engine::builder()
        .with_command(record_command(&log))
        .with_command(hold_command(Arc::clone(&gate)))
        .build();

    let first = engine.enqueue_side(&queues(&["beta:"]), &toks("hold"), None);
    assert_eq!(first.status, SideState::Started);
    gate.wait(); // hold is running on beta

    let joint = engine.enqueue_side(&queues(&["alpha:", "beta:"]), &toks("record joint"), None);
    assert_eq!(joint.status, SideState::Queued);
    let solo = engine.enqueue_side(&queues(&["alpha:"]), &toks("record solo"), None);
    assert_eq!(solo.status, SideState::Queued);

    thread::sleep(Duration::from_millis(100));
    assert!(log.entries().is_empty(), "nothing may start while beta is busy");

    gate.wait(); // let hold finish
    assert!(engine.side().wait_idle(WAIT));
    assert_eq!(log.entries(), vec!["joint", "solo"]);
}

#[test]
fn test_failing_side_command_does_not_block_queue() {
    let log = CallLog::default();
    let explode = Command::new("explode", ParameterSchema::new(), |_| {
        anyhow::bail!("side failure")
    });
    let engine = Engine::builder()
        .with_command(record_command(&log))
        .with_command(explode)
        .build();

    let report = engine
        .run_line(&toks("side jobs: explode - side jobs: record after"))
        .unwrap();
    assert_eq!(report.results.len(), 2);

    assert!(engine.side().wait_idle(WAIT));
    assert_eq!(log.entries(), vec!["after"]);
}

#[test]
fn test_when_condition_resolves_against_context() {
    let log = CallLog::default();
    let engine = Engine::builder().with_command(record_command(&log)).build();
    engine.store().set("enabled", json!("no"));

    let skipped = engine.enqueue_side(&queues(&[]), &toks("record skipped"), Some("[enabled]"));
    assert_eq!(skipped.status, SideState::Skipped);

    engine.store().set("enabled", json!("yes"));
    let started = engine.enqueue_side(&queues(&[]), &toks("record ran"), Some("[enabled]"));
    assert_ne!(started.status, SideState::Skipped);
    assert_eq!(started.queues, vec![engine.side().default_queue().to_string()]);

    assert!(engine.side().wait_idle(WAIT));
    assert_eq!(log.entries(), vec!["ran"]);
}

#[test]
fn test_side_builtin_infers_queue_names_before_command() {
    let log = CallLog::default();
    let engine = Engine::builder().with_command(record_command(&log)).build();

    let report = engine.run_line(&toks("side lane record inferred")).unwrap();
    let status = report.last.unwrap();
    assert_eq!(status["queues"], json!(["lane"]));

    assert!(engine.side().wait_idle(WAIT));
    assert_eq!(log.entries(), vec!["inferred"]);
    assert!(engine.side().queue_names().contains(&"lane".to_string()));
}
