//! Integration tests for Configuration System

use super::support::toks;
use gantry::config::ConfigLoader;
use gantry::Engine;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_config_file_drives_engine() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path();
    std::fs::create_dir_all(workspace.join("books")).unwrap();
    std::fs::write(
        workspace.join("books").join("hello.gwr"),
        "# Greet\nhello-world Config\n",
    )
    .unwrap();

    let config_file = workspace.join("gantry.toml");
    std::fs::write(
        &config_file,
        r#"
[recipes]
paths = ["books"]
extensions = ["gwr"]

[executor]
echo_comments = true

[side]
default_queue = "main"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.recipes.paths, vec![PathBuf::from("books")]);

    let engine = Engine::builder().config(&config, workspace).build();
    assert_eq!(engine.side().default_queue(), "main");
    assert_eq!(engine.recipes().search_paths(), &[workspace.join("books")]);

    let report = engine.run_recipe("hello", None).unwrap();
    assert_eq!(report.last.unwrap()["message"], json!("Hello, Config!"));
    assert_eq!(report.comments, vec!["# Greet".to_string()]);

    let status = engine.run_line(&toks("side")).unwrap().last.unwrap();
    assert_eq!(status["queues"], json!(["main"]));
}

#[test]
fn test_absolute_recipe_path_kept() {
    let temp_dir = TempDir::new().unwrap();
    let absolute = temp_dir.path().join("shared");
    let config_file = temp_dir.path().join("gantry.toml");
    std::fs::write(
        &config_file,
        format!(
            "[recipes]\npaths = [{:?}, \"local\"]\n",
            absolute.to_string_lossy()
        ),
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let workspace = PathBuf::from("/work");
    let engine = Engine::builder().config(&config, &workspace).build();
    assert_eq!(
        engine.recipes().search_paths(),
        &[absolute, workspace.join("local")]
    );
}
