//! Integration tests for chained execution, resolution and repeat

use super::support::{record_command, toks, CallLog};
use gantry::capability::{Command, Namespace, Param, ParamType, ParameterSchema};
use gantry::{Engine, EngineError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn dummy_namespace() -> Namespace {
    let setup_home = Command::new(
        "setup_home",
        ParameterSchema::new().param(Param::positional("target").default("~")),
        |call| {
            let target = call.text("target").unwrap_or_default();
            Ok(json!({"home": target}).into())
        },
    );
    let ping = Command::new(
        "ping",
        ParameterSchema::new()
            .param(Param::keyword("count").ty(ParamType::Int).default(1))
            .param(Param::keyword("verbose").ty(ParamType::Bool).default(false)),
        |call| {
            Ok(json!({
                "count": call.get("count").cloned().unwrap_or(Value::Null),
                "verbose": call.get("verbose").cloned().unwrap_or(Value::Null),
            })
            .into())
        },
    );
    Namespace::new("dummy")
        .with_command(setup_home)
        .with_namespace(Namespace::new("net").with_command(ping))
}

#[test]
fn test_compound_name_consumes_both_tokens() {
    let engine = Engine::builder().with_namespace(dummy_namespace()).build();
    let report = engine.run_line(&toks("dummy setup home /srv")).unwrap();
    assert_eq!(report.last.unwrap(), json!({"home": "/srv"}));
    assert_eq!(engine.store().get("home"), Some(json!("/srv")));
}

#[test]
fn test_nested_namespace_flags_and_bool_pair() {
    let engine = Engine::builder().with_namespace(dummy_namespace()).build();
    let report = engine
        .run_line(&toks("dummy net ping --count 3 --verbose ; dummy net ping --no-verbose"))
        .unwrap();
    assert_eq!(report.results[0], json!({"count": 3, "verbose": true}));
    assert_eq!(report.results[1]["verbose"], json!(false));
}

#[test]
fn test_invalid_cast_is_invalid_argument() {
    let engine = Engine::builder().with_namespace(dummy_namespace()).build();
    let err = engine
        .run_line(&toks("dummy net ping --count lots"))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
}

#[test]
fn test_namespace_is_not_callable() {
    let engine = Engine::builder().with_namespace(dummy_namespace()).build();
    let err = engine.run_line(&toks("dummy net")).unwrap_err();
    match err {
        EngineError::NotCallable { available, .. } => {
            assert_eq!(available, vec!["ping".to_string()]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_repeat_replays_previous_invocation() {
    let log = CallLog::default();
    let engine = Engine::builder().with_command(record_command(&log)).build();
    let report = engine
        .run_line(&toks("record Agent - repeat --times 2 --rest 0"))
        .unwrap();
    assert_eq!(log.entries(), vec!["Agent", "Agent", "Agent"]);
    assert_eq!(report.results.len(), 3);
}

#[test]
fn test_repeat_without_history_fails() {
    let engine = Engine::builder().build();
    let err = engine.run_line(&toks("repeat --times 1")).unwrap_err();
    assert!(matches!(err, EngineError::RepeatWithoutHistory));
}

#[test]
fn test_failure_aborts_rest_of_chain() {
    let log = CallLog::default();
    let failing = Command::new("explode", ParameterSchema::new(), |_| {
        anyhow::bail!("boom")
    })
    .with_module("tests.fixtures");
    let engine = Engine::builder()
        .with_command(failing)
        .with_command(record_command(&log))
        .build();

    let err = engine
        .run_line(&toks("record first - explode - record never"))
        .unwrap_err();
    match err {
        EngineError::Invocation { path, module, message } => {
            assert_eq!(path, "explode");
            assert_eq!(module, "tests.fixtures");
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(log.entries(), vec!["first"]);
}

#[test]
fn test_missing_required_argument_outside_interactive_mode() {
    let greet = Command::new(
        "greet",
        ParameterSchema::new().param(Param::positional("who")),
        |call| Ok(Value::String(call.text("who").unwrap_or_default()).into()),
    );
    let engine = Engine::builder().with_command(greet).build();
    let err = engine.run_line(&toks("greet")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::MissingArgument { ref param, .. } if param == "who"
    ));

    // A context entry with the parameter's name satisfies it.
    engine.store().set("who", json!("Ada"));
    let report = engine.run_line(&toks("greet")).unwrap();
    assert_eq!(report.last.unwrap(), json!("Ada"));
}

#[test]
fn test_unknown_flags_flow_into_var_keyword() {
    let collect = Command::new(
        "collect",
        ParameterSchema::new().param(Param::var_keyword("options")),
        |call| Ok(serde_json::to_value(call.extra())?.into()),
    );
    let engine = Engine::builder().with_command(collect).build();
    let report = engine
        .run_line(&toks("collect --mood very happy --tag=x"))
        .unwrap();
    assert_eq!(report.last.unwrap(), json!({"mood": "very happy", "tag": "x"}));
    // Mapping results are merged into the context.
    assert_eq!(engine.store().get("mood"), Some(json!("very happy")));
}

/// Cancel `engine` from another thread after `delay`.
fn cancel_after(engine: &Arc<Engine>, delay: Duration) -> thread::JoinHandle<()> {
    let engine = Arc::clone(engine);
    thread::spawn(move || {
        thread::sleep(delay);
        engine.cancel().cancel();
    })
}

#[test]
fn test_open_ended_repeat_runs_until_cancelled() {
    let engine = Engine::builder().build();
    let canceller = cancel_after(&engine, Duration::from_millis(200));

    let report = engine
        .run_line(&toks("hello-world - repeat --rest 0.01"))
        .unwrap();
    canceller.join().unwrap();

    assert!(engine.cancel().is_cancelled());
    assert!(report.results.len() > 2, "got {} results", report.results.len());
    assert!(report
        .results
        .iter()
        .all(|r| r["message"] == json!("Hello, World!")));
}

#[test]
fn test_cancel_interrupts_long_rest() {
    let log = CallLog::default();
    let engine = Engine::builder().with_command(record_command(&log)).build();
    let canceller = cancel_after(&engine, Duration::from_millis(50));

    let started = Instant::now();
    let report = engine
        .run_line(&toks("record once - repeat --times 3 --rest 600"))
        .unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(report.results.len(), 1);
    assert_eq!(log.entries(), vec!["once"]);
}
