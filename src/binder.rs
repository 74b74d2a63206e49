//! Argument Binder
//!
//! Turns the tokens left over after command resolution into values for the
//! command's declared parameters: positionals from leading non-flag tokens,
//! `--flag value` for declared flags (with `--name`/`--no-name` pairs for
//! booleans and unit-aliased flags), and the variadic slots for the rest.

use crate::capability::{Command, Param, ParamKind, ParamType, ParameterSchema};
use crate::error::EngineError;
use crate::prompt::Prompter;
use crate::sigil;
use crate::store::ContextStore;
use crate::units::{Conversion, UnitRegistry};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// How missing parameters are handled while binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindMode {
    /// Required parameters left unbound are collected later instead of failing.
    pub collect_required: bool,
    /// Optional parameters not given explicitly are collected too (wizard).
    pub collect_optional: bool,
}

/// Values bound to one command's parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    /// Declared non-variadic parameters by name.
    pub named: IndexMap<String, Value>,
    /// Variadic-positional values.
    pub rest: Vec<Value>,
    /// Variadic-keyword pairs (keys normalized to `_`).
    pub extra: IndexMap<String, Value>,
    /// Parameters still waiting for interactive collection.
    pub missing: Vec<String>,
    /// Declared parameters supplied explicitly by the tokens.
    pub given: Vec<String>,
}

impl BoundArgs {
    /// Positional and keyword views in declaration order: declared positionals
    /// followed by the variadic values, then keyword-only and extra pairs.
    pub fn split(&self, schema: &ParameterSchema) -> (Vec<Value>, IndexMap<String, Value>) {
        let mut positional = Vec::new();
        let mut keyword = IndexMap::new();
        for param in schema.params() {
            match param.kind {
                ParamKind::Positional => {
                    if let Some(value) = self.named.get(&param.name) {
                        positional.push(value.clone());
                    }
                }
                ParamKind::Keyword => {
                    if let Some(value) = self.named.get(&param.name) {
                        keyword.insert(param.name.clone(), value.clone());
                    }
                }
                ParamKind::VarPositional => positional.extend(self.rest.iter().cloned()),
                ParamKind::VarKeyword => {}
            }
        }
        for (key, value) in &self.extra {
            keyword.insert(key.clone(), value.clone());
        }
        (positional, keyword)
    }
}

enum FlagAction<'a> {
    Value(&'a Param),
    Toggle(&'a Param, bool),
    Unit(&'a Param, Conversion),
}

fn flag_key(flag: &str) -> String {
    flag.trim_start_matches('-').replace('_', "-")
}

fn build_flags<'a>(schema: &'a ParameterSchema, units: &UnitRegistry) -> HashMap<String, FlagAction<'a>> {
    let mut flags = HashMap::new();
    for param in schema.named() {
        let key = flag_key(&param.name);
        if param.is_bool() {
            flags.insert(format!("no-{}", key), FlagAction::Toggle(param, false));
            flags.insert(key, FlagAction::Toggle(param, true));
            continue;
        }
        flags.insert(key, FlagAction::Value(param));
        for (alias, convert) in units.aliases_for(&param.name) {
            flags
                .entry(flag_key(&alias))
                .or_insert(FlagAction::Unit(param, convert));
        }
    }
    flags
}

/// True for `-x` / `--x` tokens; negative numbers are values.
pub fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1 && token.parse::<f64>().is_err()
}

fn cast(param: &Param, raw: &str) -> Result<Value, EngineError> {
    param
        .ty
        .cast(raw)
        .map_err(|e| EngineError::InvalidArgument(format!("argument {}: {}", param.name, e)))
}

/// Bind `tokens` to the parameters of `command`.
///
/// Parameters not supplied take a same-named context value if one exists,
/// otherwise their declared default (sigil-looking defaults are resolved
/// against `store` first).
pub fn bind(
    command: &Command,
    tokens: &[String],
    units: &UnitRegistry,
    store: &ContextStore,
    mode: BindMode,
) -> Result<BoundArgs, EngineError> {
    let schema = command.schema();
    let flags = build_flags(schema, units);
    let var_positional = schema.var_positional();
    let var_keyword = schema.var_keyword();
    let mut positionals = schema.positionals().filter(|p| !p.is_variadic());

    let mut bound = BoundArgs::default();
    let mut unknown: Vec<String> = Vec::new();
    let mut explicit: IndexSet<String> = IndexSet::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        if !is_flag(token) {
            match positionals.find(|p| !explicit.contains(&p.name)) {
                Some(param) => {
                    bound.named.insert(param.name.clone(), cast(param, token)?);
                    explicit.insert(param.name.clone());
                }
                None => match var_positional {
                    Some(param) => bound.rest.push(cast(param, token)?),
                    None => {
                        return Err(EngineError::InvalidArgument(format!(
                            "unrecognized arguments: {}",
                            tokens[i..].join(" ")
                        )))
                    }
                },
            }
            i += 1;
            continue;
        }

        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (token.as_str(), None),
        };

        match flags.get(&flag_key(name)) {
            Some(FlagAction::Toggle(param, state)) => {
                if inline.is_some() {
                    return Err(EngineError::InvalidArgument(format!(
                        "{} does not take a value",
                        name
                    )));
                }
                bound.named.insert(param.name.clone(), Value::Bool(*state));
                explicit.insert(param.name.clone());
                i += 1;
            }
            Some(action @ (FlagAction::Value(_) | FlagAction::Unit(..))) => {
                let (raw, consumed) = match inline {
                    Some(value) => (value.to_string(), 1),
                    None => match tokens.get(i + 1) {
                        Some(next) if !is_flag(next) => (next.clone(), 2),
                        _ => return Err(EngineError::MissingValueForFlag(token.clone())),
                    },
                };
                let (param, value) = match action {
                    FlagAction::Value(param) => (*param, cast(param, &raw)?),
                    FlagAction::Unit(param, convert) => {
                        let number = convert(raw.as_str()).map_err(|e| {
                            EngineError::InvalidArgument(format!("argument {}: {:#}", name, e))
                        })?;
                        let value = param.ty.cast_number(number).map_err(|e| {
                            EngineError::InvalidArgument(format!("argument {}: {}", name, e))
                        })?;
                        (*param, value)
                    }
                    FlagAction::Toggle(..) => unreachable!("handled above"),
                };
                bound.named.insert(param.name.clone(), value);
                explicit.insert(param.name.clone());
                i += consumed;
            }
            None => {
                // Undeclared flag: keep it with the values that follow it.
                unknown.push(token.clone());
                i += 1;
                if inline.is_none() {
                    while i < tokens.len() && !tokens[i].starts_with('-') {
                        unknown.push(tokens[i].clone());
                        i += 1;
                    }
                }
            }
        }
    }

    if !unknown.is_empty() {
        if var_keyword.is_some() {
            bound.extra = parse_extra_kwargs(&unknown)?;
        } else if let Some(param) = var_positional {
            for token in &unknown {
                bound.rest.push(cast(param, token)?);
            }
        } else {
            return Err(EngineError::InvalidArgument(format!(
                "unrecognized arguments: {}",
                unknown.join(" ")
            )));
        }
    }

    for param in schema.named() {
        if explicit.contains(&param.name) {
            continue;
        }
        if let Some(value) = store.get(&param.name) {
            debug!(param = %param.name, "Injected parameter from context");
            bound.named.insert(param.name.clone(), value);
            continue;
        }
        match &param.default {
            Some(default) => {
                if mode.collect_optional {
                    bound.missing.push(param.name.clone());
                }
                bound
                    .named
                    .insert(param.name.clone(), resolve_default(&param.name, default, store));
            }
            None if mode.collect_required || mode.collect_optional => {
                bound.missing.push(param.name.clone());
            }
            None => {
                return Err(EngineError::MissingArgument {
                    command: command.name().to_string(),
                    param: param.name.clone(),
                })
            }
        }
    }

    bound.given = explicit.into_iter().collect();
    debug!(command = command.name(), ?bound, "Bound arguments");
    Ok(bound)
}

fn resolve_default(name: &str, default: &Value, store: &ContextStore) -> Value {
    match default {
        Value::String(text) if sigil::contains_sigil(text) => match store.resolve(text) {
            Ok(resolved) => resolved.unwrap_or(Value::Null),
            Err(e) => {
                warn!(param = name, error = %e, "Failed to resolve default");
                default.clone()
            }
        },
        other => other.clone(),
    }
}

/// Parse variadic-keyword tokens: `--key=value`, or `--key` followed by a
/// run of non-dash tokens joined with single spaces.
pub fn parse_extra_kwargs(tokens: &[String]) -> Result<IndexMap<String, Value>, EngineError> {
    let mut extra = IndexMap::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let Some(body) = token.strip_prefix("--") else {
            return Err(EngineError::InvalidArgument(format!(
                "Invalid kwarg format `{}`; expected `--key[=value]` or `--key value`.",
                token
            )));
        };
        let (key, value) = match body.split_once('=') {
            Some((key, value)) => {
                i += 1;
                (key, value.to_string())
            }
            None => {
                i += 1;
                let mut parts = Vec::new();
                while i < tokens.len() && !tokens[i].starts_with('-') {
                    parts.push(tokens[i].as_str());
                    i += 1;
                }
                if parts.is_empty() {
                    return Err(EngineError::MissingValueForFlag(token.clone()));
                }
                (body, parts.join(" "))
            }
        };
        if key.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "Expected a key after `{}`",
                token
            )));
        }
        extra.insert(key.replace(['-', '.', ' '], "_"), Value::String(value));
    }
    Ok(extra)
}

/// Join the values following a `--key` token, up to the next dash-prefixed
/// token, into a single token so multi-word values need no quoting.
pub fn join_unquoted_kwargs(tokens: &[String]) -> Vec<String> {
    let mut combined = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        combined.push(token.clone());
        i += 1;
        if token.starts_with("--") && !token.contains('=') {
            let mut parts = Vec::new();
            while i < tokens.len() && !tokens[i].starts_with('-') {
                parts.push(tokens[i].as_str());
                i += 1;
            }
            if !parts.is_empty() {
                combined.push(parts.join(" "));
            }
        }
    }
    combined
}

/// Prompt for every parameter listed in `bound.missing`.
///
/// Booleans are a yes/no question defaulting from the declared default; other
/// types are asked until the answer casts. An empty answer keeps the default
/// when there is one.
pub fn collect_missing(
    command: &Command,
    bound: &mut BoundArgs,
    prompter: &dyn Prompter,
) -> Result<(), EngineError> {
    let missing = std::mem::take(&mut bound.missing);
    for name in missing {
        let Some(param) = command.schema().get(&name) else {
            continue;
        };
        let current = bound.named.get(&name).filter(|v| !v.is_null()).cloned();
        let value = if param.is_bool() {
            let default = current.as_ref().and_then(Value::as_bool).unwrap_or(false);
            Value::Bool(prompter.confirm(&format!("{}?", name), default)?)
        } else {
            ask_until_valid(param, current, prompter)?
        };
        bound.named.insert(name, value);
    }
    Ok(())
}

fn ask_until_valid(
    param: &Param,
    default: Option<Value>,
    prompter: &dyn Prompter,
) -> Result<Value, EngineError> {
    let prompt = match &default {
        Some(value) => format!("{} [{}]", param.name, sigil::value_to_text(value)),
        None => param.name.clone(),
    };
    loop {
        let answer = prompter.input(&prompt)?;
        if answer.is_empty() {
            if let Some(value) = &default {
                return Ok(value.clone());
            }
            if !param.is_required() {
                return Ok(Value::Null);
            }
            continue;
        }
        match param.ty.cast(&answer) {
            Ok(value) => return Ok(value),
            Err(_) => prompter.notice(&format!(
                "Invalid value for {}, expected {}.",
                param.name,
                type_label(&param.ty)
            )),
        }
    }
}

fn type_label(ty: &ParamType) -> String {
    match ty {
        ParamType::Choice(choices) => format!("one of {}", choices.join(", ")),
        other => other.name().to_string(),
    }
}
