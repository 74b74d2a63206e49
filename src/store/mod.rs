//! Context Store
//!
//! Shared mutable state read by sigil resolution and argument binding: the
//! results log (latest return per command name) and the context map (explicit
//! arguments plus merged mapping results). Lookups always read the live maps.

use crate::error::EngineError;
use crate::sigil;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Default)]
struct StoreState {
    results: IndexMap<String, Value>,
    context: IndexMap<String, Value>,
    used: IndexSet<String>,
}

/// Where a resolved key was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    Results,
    Context,
    Env,
}

/// Results log and context map for one execution session.
///
/// Shared between the foreground executor and side-queue threads, so all
/// access goes through an internal lock held only for the map operation.
#[derive(Debug, Default)]
pub struct ContextStore {
    state: RwLock<StoreState>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose context map starts with `context`.
    pub fn with_context(context: IndexMap<String, Value>) -> Self {
        let store = Self::new();
        store.state.write().context = context;
        store
    }

    /// Overwrite the latest result recorded for `command`.
    pub fn record_result(&self, command: &str, value: Value) {
        debug!(command, "Recording result");
        self.state.write().results.insert(command.to_string(), value);
    }

    pub fn result(&self, command: &str) -> Option<Value> {
        self.state.read().results.get(command).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.state.write().context.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().context.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state.write().context.shift_remove(key)
    }

    /// Merge every entry of `map` into the context map; last write wins.
    pub fn merge(&self, map: &Map<String, Value>) {
        let mut state = self.state.write();
        for (key, value) in map {
            state.context.insert(key.clone(), value.clone());
        }
    }

    /// Merge `value` into the context map when it is a mapping.
    /// Returns whether a merge happened.
    pub fn merge_value(&self, value: &Value) -> bool {
        match value {
            Value::Object(map) => {
                self.merge(map);
                true
            }
            _ => false,
        }
    }

    pub fn context_snapshot(&self) -> IndexMap<String, Value> {
        self.state.read().context.clone()
    }

    pub fn results_snapshot(&self) -> IndexMap<String, Value> {
        self.state.read().results.clone()
    }

    /// Keys successfully resolved through [`ContextStore::find_value`] so far.
    pub fn used_keys(&self) -> Vec<String> {
        self.state.read().used.iter().cloned().collect()
    }

    /// Drop all results, context and usage records.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.results.clear();
        state.context.clear();
        state.used.clear();
    }

    /// Look `key` up in results, then context, then the environment.
    ///
    /// Within each map the key is tried as given, lower-cased, upper-cased and
    /// then with dashes and underscores swapped. The environment is consulted
    /// with the upper-cased name only.
    pub fn find_value(&self, key: &str) -> Option<Value> {
        self.find_with_source(key).map(|(value, _)| value)
    }

    pub fn find_with_source(&self, key: &str) -> Option<(Value, LookupSource)> {
        let variants = key_variants(key);
        let found = {
            let state = self.state.read();
            variants
                .iter()
                .find_map(|k| state.results.get(k.as_str()))
                .map(|v| (v.clone(), LookupSource::Results))
                .or_else(|| {
                    variants
                        .iter()
                        .find_map(|k| state.context.get(k.as_str()))
                        .map(|v| (v.clone(), LookupSource::Context))
                })
        };
        let found = found.or_else(|| {
            std::env::var(key.to_uppercase())
                .ok()
                .map(|v| (Value::String(v), LookupSource::Env))
        });

        if found.is_some() {
            self.state.write().used.insert(key.to_string());
        }
        found
    }

    /// Resolve every sigil in `text`. `None` means the result was empty.
    pub fn resolve(&self, text: &str) -> Result<Option<Value>, EngineError> {
        let resolved = sigil::replace_sigils(text, |key| self.find_value(key))?;
        debug!(text, ?resolved, "Resolved sigils");
        Ok(resolved)
    }

    /// Resolve `text` to plain text; an absent result becomes an empty string.
    pub fn resolve_text(&self, text: &str) -> Result<String, EngineError> {
        Ok(self
            .resolve(text)?
            .map(|v| sigil::value_to_text(&v))
            .unwrap_or_default())
    }

    /// Resolve sigils inside a value: strings directly, lists element-wise.
    /// Strings that resolve to nothing become `null`.
    pub fn resolve_value(&self, value: &Value) -> Result<Value, EngineError> {
        match value {
            Value::String(text) if sigil::contains_sigil(text) => {
                Ok(self.resolve(text)?.unwrap_or(Value::Null))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }
}

fn key_variants(key: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::with_capacity(5);
    for candidate in [
        key.to_string(),
        key.to_lowercase(),
        key.to_uppercase(),
        key.replace('-', "_"),
        key.replace('_', "-"),
    ] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
