//! Capabilities: named, introspectable callables the engine dispatches to.
//!
//! Each [`Command`] carries an explicit [`ParameterSchema`] declared at
//! registration time. Commands live in [`Namespace`] lookup tables under a
//! root [`Registry`] that combines the built-ins with plugin sources.

pub mod builtins;
mod registry;
mod schema;

pub use registry::{normalize_name, Entry, Namespace, PluginCatalog, PluginSource, Registry};
pub use schema::{parse_bool, Param, ParamKind, ParamType, ParameterSchema};

use crate::binder::BoundArgs;
use crate::engine::Engine;
use crate::executor::RepeatDirective;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// What an invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A plain value; mappings are merged into the context map.
    Value(Value),
    /// Replay earlier invocations instead of producing a value.
    Repeat(RepeatDirective),
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

/// Handler signature shared by every capability.
pub type Handler = Arc<dyn Fn(Call) -> anyhow::Result<Outcome> + Send + Sync>;

/// A registered capability.
#[derive(Clone)]
pub struct Command {
    name: String,
    module: String,
    summary: Option<String>,
    schema: ParameterSchema,
    handler: Handler,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new<F>(name: &str, schema: ParameterSchema, handler: F) -> Self
    where
        F: Fn(Call) -> anyhow::Result<Outcome> + Send + Sync + 'static,
    {
        Self {
            name: normalize_name(name),
            module: "gantry".to_string(),
            summary: None,
            schema,
            handler: Arc::new(handler),
        }
    }

    /// Originating module, reported when the command fails.
    pub fn with_module(mut self, module: &str) -> Self {
        self.module = module.to_string();
        self
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    pub fn invoke(&self, call: Call) -> anyhow::Result<Outcome> {
        (self.handler)(call)
    }
}

/// Arguments and engine access handed to a handler.
pub struct Call {
    path: String,
    args: BoundArgs,
    engine: Arc<Engine>,
}

impl Call {
    pub fn new(path: String, args: BoundArgs, engine: Arc<Engine>) -> Self {
        Self { path, args, engine }
    }

    /// Dotted call path, e.g. `net.ping`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn args(&self) -> &BoundArgs {
        &self.args
    }

    /// Value bound to a declared (non-variadic) parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.args.named.get(name).filter(|v| !v.is_null())
    }

    /// Whether the tokens supplied `name` explicitly (as opposed to a
    /// default or context value).
    pub fn given(&self, name: &str) -> bool {
        self.args.given.iter().any(|g| g == name)
    }

    /// Declared parameter rendered as text.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(crate::sigil::value_to_text)
    }

    /// Declared parameter that must be present.
    pub fn require(&self, name: &str) -> anyhow::Result<&Value> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("missing argument '{}'", name))
    }

    /// Values collected by the variadic-positional parameter.
    pub fn rest(&self) -> &[Value] {
        &self.args.rest
    }

    /// Pairs collected by the variadic-keyword parameter.
    pub fn extra(&self) -> &IndexMap<String, Value> {
        &self.args.extra
    }
}
