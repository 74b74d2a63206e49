//! Integration tests for loading and running recipe files

use super::support::{record_command, toks, CallLog};
use gantry::executor::ExecOptions;
use gantry::recipe::RecipeLoader;
use gantry::{Engine, EngineError};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write_recipe(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

fn loader(dir: &TempDir) -> RecipeLoader {
    RecipeLoader::new(
        vec![dir.path().to_path_buf()],
        vec!["recipe".to_string(), "txt".to_string()],
    )
}

#[test]
fn test_recipe_runs_block_and_continuation_lines() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        dir.path(),
        "steps.recipe",
        "# Setup\nrecord boot:\n    - one\n    - two\nrecord \\\n   three\n",
    );
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .build();

    let report = engine.run_recipe("steps", None).unwrap();
    assert_eq!(log.entries(), vec!["boot one", "boot two", "three"]);
    assert_eq!(report.last.unwrap(), json!("three"));
}

#[test]
fn test_name_variants_and_nested_directories() {
    let dir = TempDir::new().unwrap();
    write_recipe(dir.path(), "web_site.txt", "record flat\n");
    write_recipe(dir.path(), "ops/deploy.recipe", "record nested\n");
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .build();

    engine.run_recipe("web-site", None).unwrap();
    engine.run_recipe("ops.deploy", None).unwrap();
    assert_eq!(log.entries(), vec!["flat", "nested"]);
}

#[test]
fn test_missing_recipe_lists_candidates() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::builder().recipes(loader(&dir)).build();
    match engine.run_recipe("absent", None).unwrap_err() {
        EngineError::RecipeNotFound { tried } => {
            assert!(tried.iter().any(|p| p.ends_with("absent.recipe")));
            assert!(tried.iter().any(|p| p.ends_with("absent.txt")));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn test_section_keeps_prelude() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        dir.path(),
        "multi.recipe",
        "record prelude\n# Build\nrecord build\n# Deploy\nrecord deploy\n",
    );
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .build();

    engine.run_recipe("multi", Some("deploy")).unwrap();
    assert_eq!(log.entries(), vec!["prelude", "deploy"]);

    let err = engine.run_recipe("multi", Some("release")).unwrap_err();
    assert!(matches!(err, EngineError::RecipeSectionNotFound { .. }));
}

#[test]
fn test_unknown_command_falls_back_to_recipe_with_context() {
    let dir = TempDir::new().unwrap();
    write_recipe(dir.path(), "greet.recipe", "record [who]\n");
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .build();

    engine.run_line(&toks("greet --who Ada")).unwrap();
    assert_eq!(log.entries(), vec!["Ada"]);
}

#[test]
fn test_run_recipe_capability() {
    let dir = TempDir::new().unwrap();
    write_recipe(dir.path(), "one.recipe", "record first\n");
    write_recipe(dir.path(), "two.recipe", "record [label]\n");
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .build();

    let report = engine
        .run_line(&toks("run-recipe one two --label second"))
        .unwrap();
    assert_eq!(log.entries(), vec!["first", "second"]);
    assert_eq!(report.last.unwrap(), json!(["first", "second"]));
}

#[test]
fn test_comments_are_rendered_when_echoing() {
    let dir = TempDir::new().unwrap();
    write_recipe(
        dir.path(),
        "noted.recipe",
        "# Deploying [target|staging]\nrecord go\n",
    );
    let log = CallLog::default();
    let engine = Engine::builder()
        .recipes(loader(&dir))
        .with_command(record_command(&log))
        .options(ExecOptions {
            echo_comments: true,
            ..ExecOptions::default()
        })
        .build();

    let report = engine.run_recipe("noted", None).unwrap();
    assert_eq!(report.comments, vec!["# Deploying staging".to_string()]);
}
