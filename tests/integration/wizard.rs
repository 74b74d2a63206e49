//! Integration tests for wizard and interactive collection

use super::support::{record_command, toks, CallLog};
use gantry::capability::{Command, Param, ParamType, ParameterSchema};
use gantry::executor::ExecOptions;
use gantry::prompt::{Prompter, ScriptedPrompter};
use gantry::recipe::RecipeLoader;
use gantry::{Engine, EngineError};
use serde_json::{json, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;

/// Answers from a script and notes how many invocations had happened when
/// each question was asked.
struct WatchingPrompter {
    inner: ScriptedPrompter,
    log: CallLog,
    seen: Mutex<Vec<usize>>,
}

impl WatchingPrompter {
    fn new(answers: &[&str], log: &CallLog) -> Self {
        Self {
            inner: ScriptedPrompter::new(answers.iter().copied()),
            log: log.clone(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn observe(&self) {
        self.seen.lock().push(self.log.entries().len());
    }
}

impl Prompter for WatchingPrompter {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, EngineError> {
        self.observe();
        self.inner.confirm(prompt, default)
    }

    fn input(&self, prompt: &str) -> Result<String, EngineError> {
        self.observe();
        self.inner.input(prompt)
    }

    fn notice(&self, message: &str) {
        self.inner.notice(message)
    }
}

fn greet_command(log: &CallLog) -> Command {
    let log = log.clone();
    let schema = ParameterSchema::new()
        .param(Param::positional("who"))
        .param(Param::keyword("loud").ty(ParamType::Bool).default(false))
        .param(Param::keyword("times").ty(ParamType::Int).default(1));
    Command::new("greet", schema, move |call| {
        let who = call.text("who").unwrap_or_default();
        let loud = call.get("loud").and_then(Value::as_bool).unwrap_or(false);
        let times = call.get("times").and_then(Value::as_i64).unwrap_or(1);
        let text = if loud { who.to_uppercase() } else { who };
        for _ in 0..times {
            log.push(text.clone());
        }
        Ok(Value::String(text).into())
    })
}

fn wizard() -> ExecOptions {
    ExecOptions {
        wizard: true,
        ..ExecOptions::default()
    }
}

#[test]
fn test_wizard_collects_everything_before_invoking() {
    let log = CallLog::default();
    // who, loud, times for greet; record takes only variadic labels.
    let prompter = Arc::new(WatchingPrompter::new(&["Ada", "y", "x", "2"], &log));
    let engine = Engine::builder()
        .with_command(record_command(&log))
        .with_command(greet_command(&log))
        .prompter(Arc::clone(&prompter) as Arc<dyn Prompter>)
        .options(wizard())
        .build();

    let report = engine.run_line(&toks("record first - greet")).unwrap();

    assert!(
        prompter.seen.lock().iter().all(|&n| n == 0),
        "no invocation may happen before every answer is collected"
    );
    assert_eq!(report.last.unwrap(), json!("ADA"));
    // "x" was rejected for the integer parameter and asked again.
    assert_eq!(prompter.inner.asked().len(), 4);
    assert_eq!(log.entries().len(), 3);
}

#[test]
fn test_wizard_fuzzy_match_accepted_and_declined() {
    let accepted = Arc::new(ScriptedPrompter::new(["y", "Grace", "", ""]));
    let engine = Engine::builder()
        .prompter(Arc::clone(&accepted) as Arc<dyn Prompter>)
        .options(wizard())
        .build();
    let report = engine.run_line(&toks("helo-world")).unwrap();
    assert_eq!(report.last.unwrap()["name"], json!("Grace"));

    let declined = Arc::new(ScriptedPrompter::new(["n"]));
    let engine = Engine::builder()
        .prompter(declined as Arc<dyn Prompter>)
        .options(wizard())
        .build();
    let err = engine.run_line(&toks("helo-world")).unwrap_err();
    assert!(matches!(err, EngineError::Aborted(_)));
}

#[test]
fn test_interactive_prompts_only_for_missing_required() {
    let log = CallLog::default();
    let prompter = Arc::new(ScriptedPrompter::new(["Lin"]));
    let engine = Engine::builder()
        .with_command(greet_command(&log))
        .prompter(Arc::clone(&prompter) as Arc<dyn Prompter>)
        .options(ExecOptions {
            interactive: true,
            ..ExecOptions::default()
        })
        .build();

    let report = engine.run_line(&toks("greet")).unwrap();
    assert_eq!(report.last.unwrap(), json!("Lin"));
    assert_eq!(prompter.asked(), vec!["who".to_string()]);
}

#[test]
fn test_wizard_recipe_fallback_prompts_when_invoked() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("zzz.recipe"), "greet\n").unwrap();
    let log = CallLog::default();
    let prompter = Arc::new(WatchingPrompter::new(&["Ada", "n", "1"], &log));
    let engine = Engine::builder()
        .with_command(record_command(&log))
        .with_command(greet_command(&log))
        .recipes(RecipeLoader::new(
            vec![dir.path().to_path_buf()],
            vec!["recipe".into()],
        ))
        .prompter(Arc::clone(&prompter) as Arc<dyn Prompter>)
        .options(wizard())
        .build();

    let report = engine.run_line(&toks("record first - zzz")).unwrap();

    assert_eq!(report.last.unwrap(), json!("Ada"));
    // The nested recipe collects its answers after the earlier chunk ran.
    assert_eq!(*prompter.seen.lock(), vec![1, 1, 1]);
    assert_eq!(log.entries(), vec!["first", "Ada"]);
}
