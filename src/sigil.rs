//! Sigil placeholders: `[key]`, `[key|fallback]` and `[|fallback]`.
//!
//! This module only knows the syntax. Where values come from is decided by the
//! caller's lookup function (see [`crate::store::ContextStore`]).

use crate::error::EngineError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn sigil_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").expect("sigil pattern is valid"))
}

/// A single parsed placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sigil {
    /// Lookup key, trimmed and unquoted. Empty only when a fallback is present.
    pub key: String,
    /// Text after the `|`, if any.
    pub fallback: Option<String>,
    /// The key was written as a quoted literal (`["text"]`).
    pub quoted: bool,
}

impl Sigil {
    /// Parse the text between the brackets.
    pub fn parse(inner: &str) -> Result<Self, EngineError> {
        let (raw_key, fallback) = match inner.split_once('|') {
            Some((key, fallback)) => (key, Some(unquote(fallback.trim()).to_string())),
            None => (inner, None),
        };
        let raw_key = raw_key.trim();
        let quoted = is_quoted(raw_key);
        let key = unquote(raw_key).to_string();

        let fallback_empty = fallback.as_deref().map(str::is_empty).unwrap_or(true);
        if key.is_empty() && fallback_empty {
            return Err(EngineError::InvalidSigil(format!("[{}]", inner)));
        }

        Ok(Self {
            key,
            fallback,
            quoted,
        })
    }
}

fn is_quoted(text: &str) -> bool {
    text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')))
}

fn unquote(text: &str) -> &str {
    if is_quoted(text) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// True when `text` contains at least one placeholder.
pub fn contains_sigil(text: &str) -> bool {
    sigil_pattern().is_match(text)
}

/// Every placeholder in `text`, in order of appearance.
pub fn list_sigils(text: &str) -> Vec<String> {
    sigil_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Strip the eager-default marker (`%[key]` -> `[key]`).
pub fn strip_eager_marker(text: &str) -> &str {
    match text.strip_prefix('%') {
        Some(rest) if rest.starts_with('[') => rest,
        _ => text,
    }
}

/// Replace every placeholder in `text` using `lookup`.
///
/// A text consisting of exactly one placeholder yields the looked-up value
/// unchanged, so mappings and numbers survive. Otherwise non-string values are
/// JSON encoded into the surrounding text. An empty overall result is returned
/// as `None` to distinguish "nothing produced" from "produced empty text".
pub fn replace_sigils<F>(text: &str, mut lookup: F) -> Result<Option<Value>, EngineError>
where
    F: FnMut(&str) -> Option<Value>,
{
    let text = strip_eager_marker(text);
    let pattern = sigil_pattern();
    let matches: Vec<_> = pattern.captures_iter(text).collect();

    if matches.is_empty() {
        return Ok(non_empty(Value::String(text.to_string())));
    }

    if matches.len() == 1 {
        let whole = matches[0].get(0).map(|m| m.range());
        if whole == Some(0..text.len()) {
            let sigil = Sigil::parse(&matches[0][1])?;
            return Ok(resolve_single(&sigil, &mut lookup).and_then(non_empty));
        }
    }

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for caps in &matches {
        let Some(whole) = caps.get(0) else { continue };
        output.push_str(&text[last..whole.start()]);
        let sigil = Sigil::parse(&caps[1])?;
        match resolve_single(&sigil, &mut lookup) {
            Some(Value::String(s)) => output.push_str(&s),
            Some(other) => output.push_str(&other.to_string()),
            None => {}
        }
        last = whole.end();
    }
    output.push_str(&text[last..]);

    Ok(non_empty(Value::String(output)))
}

fn resolve_single<F>(sigil: &Sigil, lookup: &mut F) -> Option<Value>
where
    F: FnMut(&str) -> Option<Value>,
{
    if !sigil.key.is_empty() {
        if let Some(value) = lookup(&sigil.key) {
            return Some(value);
        }
        if let Some(value) = lookup_path(&sigil.key, lookup) {
            return Some(value);
        }
        if sigil.quoted {
            return Some(Value::String(sigil.key.clone()));
        }
    }
    sigil.fallback.clone().map(Value::String)
}

/// Resolve `base.part.part` by looking up `base` and walking into it.
fn lookup_path<F>(key: &str, lookup: &mut F) -> Option<Value>
where
    F: FnMut(&str) -> Option<Value>,
{
    let mut parts = key.split('.');
    let base = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return None;
    }
    let mut current = lookup(base)?;
    for part in rest {
        if part.starts_with('_') {
            return None;
        }
        current = match current {
            Value::Object(mut map) => map.remove(part)?,
            Value::Array(mut items) => {
                let index: usize = part.parse().ok()?;
                if index >= items.len() {
                    return None;
                }
                items.swap_remove(index)
            }
            _ => return None,
        };
    }
    Some(current)
}

fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        _ => Some(value),
    }
}

/// Render a value as plain text: strings verbatim, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
