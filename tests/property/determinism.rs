//! Property-based tests for parsing and resolution guarantees

use gantry::capability::normalize_name;
use gantry::recipe::parse_recipe;
use gantry::recipe::split_line_chunks;
use gantry::store::ContextStore;
use proptest::prelude::*;
use serde_json::json;

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

fn recipe_line() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::collection::vec(word(), 1..4).prop_map(|w| w.join(" ")),
        (word(), word()).prop_map(|(c, v)| format!("{} --opt {}", c, v)),
        word().prop_map(|c| format!("{} block:", c)),
        word().prop_map(|v| format!("    - {}", v)),
        word().prop_map(|v| format!("    --flag {}", v)),
        word().prop_map(|c| format!("# {}", c)),
        Just(String::new()),
    ]
}

proptest! {
    /// Parsing the same recipe twice yields identical chunks.
    #[test]
    fn test_recipe_parse_is_deterministic(lines in prop::collection::vec(recipe_line(), 0..20)) {
        let text = lines.join("\n");
        let first = parse_recipe(&text, "prop", None).unwrap();
        let second = parse_recipe(&text, "prop", None).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Every parsed command chunk has tokens without surrounding whitespace.
    #[test]
    fn test_recipe_chunks_are_trimmed(lines in prop::collection::vec(recipe_line(), 0..20)) {
        let text = lines.join("\n");
        let parsed = parse_recipe(&text, "prop", None).unwrap();
        for chunk in parsed.chunks.iter().filter(|c| !c.is_empty()) {
            for token in chunk.tokens() {
                prop_assert!(!token.is_empty());
                prop_assert_eq!(token.trim(), token.as_str());
            }
        }
    }

    /// Splitting on separators never yields empty chunks and keeps every other token.
    #[test]
    fn test_line_split_preserves_tokens(tokens in prop::collection::vec(
        prop_oneof![word(), Just("-".to_string()), Just(";".to_string())], 0..16)) {
        let chunks = split_line_chunks(&tokens);
        prop_assert!(chunks.iter().all(|c| !c.is_empty()));
        let kept: Vec<String> = chunks.iter().flat_map(|c| c.tokens().to_vec()).collect();
        let expected: Vec<String> = tokens.into_iter().filter(|t| t != "-" && t != ";").collect();
        prop_assert_eq!(kept, expected);
    }

    /// Name normalization is idempotent.
    #[test]
    fn test_normalize_name_idempotent(name in "[a-zA-Z0-9 ._-]{0,16}") {
        let once = normalize_name(&name);
        prop_assert_eq!(normalize_name(&once), once.clone());
        prop_assert!(!once.contains('-') && !once.contains('.') && !once.contains(' '));
    }

    /// A context value is found whichever case the sigil key uses.
    #[test]
    fn test_sigil_lookup_is_case_tolerant(key in "gprop_[a-z]{1,8}", value in "[a-z]{1,8}") {
        let store = ContextStore::new();
        store.set(key.clone(), json!(value.clone()));
        let upper = format!("[{}]", key.to_uppercase());
        prop_assert_eq!(store.resolve(&upper).unwrap(), Some(json!(value)));
    }
}
