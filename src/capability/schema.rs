//! Parameter schema: declared once per capability at registration time.

use serde_json::{Number, Value};

/// How a parameter receives its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound from leading non-flag tokens, or by `--name`.
    Positional,
    /// Bound only by `--name` (or `--name`/`--no-name` for booleans).
    Keyword,
    /// Collects every remaining non-flag token.
    VarPositional,
    /// Collects every `--key value` pair no declared flag matched.
    VarKeyword,
}

/// Declared value type used to cast raw token text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParamType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    /// One of a fixed set of strings.
    Choice(Vec<String>),
    /// Raw text parsed as JSON, falling back to a string.
    Json,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Str => "str",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::Choice(_) => "choice",
            ParamType::Json => "json",
        }
    }

    /// Cast raw token text to this type.
    pub fn cast(&self, raw: &str) -> Result<Value, String> {
        match self {
            ParamType::Str => Ok(Value::String(raw.to_string())),
            ParamType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("invalid int value: '{}'", raw)),
            ParamType::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float value: '{}'", raw)),
            ParamType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("invalid bool value: '{}'", raw)),
            ParamType::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(format!(
                        "invalid choice: '{}' (choose from {})",
                        raw,
                        choices.join(", ")
                    ))
                }
            }
            ParamType::Json => {
                Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
        }
    }

    /// Cast a number produced by a unit conversion.
    pub fn cast_number(&self, number: f64) -> Result<Value, String> {
        match self {
            ParamType::Int => Ok(Value::from(number.trunc() as i64)),
            ParamType::Float | ParamType::Json => Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid float value: {}", number)),
            ParamType::Bool => Ok(Value::Bool(number != 0.0)),
            ParamType::Str | ParamType::Choice(_) => self.cast(&number.to_string()),
        }
    }
}

/// Strict yes/no parsing used for boolean parameters.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
    pub ty: ParamType,
    pub default: Option<Value>,
    pub help: Option<String>,
}

impl Param {
    fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty: ParamType::Str,
            default: None,
            help: None,
        }
    }

    pub fn positional(name: &str) -> Self {
        Self::new(name, ParamKind::Positional)
    }

    pub fn keyword(name: &str) -> Self {
        Self::new(name, ParamKind::Keyword)
    }

    pub fn var_positional(name: &str) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    pub fn var_keyword(name: &str) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    pub fn ty(mut self, ty: ParamType) -> Self {
        self.ty = ty;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.is_variadic()
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self.kind, ParamKind::VarPositional | ParamKind::VarKeyword)
    }

    pub fn is_bool(&self) -> bool {
        self.ty == ParamType::Bool || matches!(self.default, Some(Value::Bool(_)))
    }

    /// Flag spelling: `--some-name`.
    pub fn flag(&self) -> String {
        format!("--{}", self.name.replace('_', "-"))
    }
}

/// Ordered parameter descriptors for one capability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<Param>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn var_positional(&self) -> Option<&Param> {
        self.params
            .iter()
            .find(|p| p.kind == ParamKind::VarPositional)
    }

    pub fn var_keyword(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.kind == ParamKind::VarKeyword)
    }

    /// Declared positional parameters in order.
    pub fn positionals(&self) -> impl Iterator<Item = &Param> {
        self.params
            .iter()
            .filter(|p| p.kind == ParamKind::Positional)
    }

    /// Non-variadic parameters (positional and keyword).
    pub fn named(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| !p.is_variadic())
    }

    /// One-line usage sample, e.g. `<name> [--greeting GREETING] [args...]`.
    pub fn usage(&self) -> String {
        let mut parts = Vec::new();
        for param in &self.params {
            let part = match param.kind {
                ParamKind::Positional if param.is_required() => format!("<{}>", param.name),
                ParamKind::Positional => format!("[{}]", param.name),
                ParamKind::Keyword if param.is_bool() => {
                    format!("[{}|--no-{}]", param.flag(), param.name.replace('_', "-"))
                }
                ParamKind::Keyword => {
                    let flag = format!("{} {}", param.flag(), param.name.to_uppercase());
                    if param.is_required() {
                        flag
                    } else {
                        format!("[{}]", flag)
                    }
                }
                ParamKind::VarPositional => format!("[{}...]", param.name),
                ParamKind::VarKeyword => "[--key value...]".to_string(),
            };
            parts.push(part);
        }
        parts.join(" ")
    }
}
