//! Integration tests for sigil resolution against results, context and environment

use super::support::toks;
use gantry::{Engine, EngineError};
use indexmap::IndexMap;
use serde_json::json;

fn engine_with(context: &[(&str, serde_json::Value)]) -> std::sync::Arc<Engine> {
    let map: IndexMap<String, serde_json::Value> = context
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Engine::builder().context(map).build()
}

#[test]
fn test_context_fallback_and_environment() {
    let engine = engine_with(&[("name", json!("Agent"))]);
    assert_eq!(
        engine.resolve("Hello [name|guest]").unwrap(),
        Some(json!("Hello Agent"))
    );
    assert_eq!(
        engine.resolve("[missing|fallback]").unwrap(),
        Some(json!("fallback"))
    );

    std::env::set_var("TEST_ENV", "env_value");
    assert_eq!(
        engine.resolve("[TEST_ENV|fallback]").unwrap(),
        Some(json!("env_value"))
    );
    std::env::remove_var("TEST_ENV");
}

#[test]
fn test_results_take_precedence_over_context() {
    let engine = engine_with(&[("sigils", json!("from context"))]);
    engine.run_line(&toks("sigils from-results")).unwrap();
    assert_eq!(
        engine.resolve("[sigils]").unwrap(),
        Some(json!("from-results"))
    );
}

#[test]
fn test_unresolved_sigil_is_absent() {
    let engine = engine_with(&[]);
    assert_eq!(engine.resolve("[gantry_never_set_anywhere]").unwrap(), None);
}

#[test]
fn test_empty_sigil_is_an_error() {
    let engine = engine_with(&[]);
    assert!(matches!(engine.resolve("[ ]"), Err(EngineError::InvalidSigil(_))));
    assert!(matches!(engine.resolve("[|]"), Err(EngineError::InvalidSigil(_))));
}

#[test]
fn test_dotted_path_and_raw_values() {
    let engine = engine_with(&[("ports", json!([80, 443]))]);
    engine.run_line(&toks("hello-world Ada")).unwrap();
    assert_eq!(
        engine.resolve("[hello_world.message]").unwrap(),
        Some(json!("Hello, Ada!"))
    );
    // A lone sigil keeps the raw value; embedded ones are encoded as text.
    assert_eq!(engine.resolve("[ports]").unwrap(), Some(json!([80, 443])));
    assert_eq!(
        engine.resolve("ports: [ports]").unwrap(),
        Some(json!("ports: [80,443]"))
    );
}

#[test]
fn test_arguments_resolve_sigils_at_invoke_time() {
    let engine = engine_with(&[("who", json!("Grace"))]);
    let report = engine
        .run_line(&toks("hello-world [who] --greeting [salute|Hi]"))
        .unwrap();
    assert_eq!(report.last.unwrap()["message"], json!("Hi, Grace!"));
}
