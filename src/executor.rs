//! Executor
//!
//! Drives each chunk through resolve, bind and invoke. In wizard mode every
//! chunk of the run is resolved and has its parameters collected before any of
//! them is invoked. A `repeat` outcome replays the calls already executed in
//! the current run.

mod repeat;

pub use repeat::{CancelToken, RepeatDirective};

use crate::binder::{self, BindMode, BoundArgs};
use crate::capability::{Call, Command, Entry, Namespace, Outcome};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::recipe::{parse_recipe_context, CommandChunk};
use crate::resolver::{Resolution, Resolver, Target};
use crate::sigil;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where a run's chunks came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Tokens given directly (command line or embedding code).
    Line,
    /// Chunks loaded from a recipe file.
    Recipe,
    /// A single background chunk started by the side-queue scheduler.
    Side,
}

/// Per-run execution switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Collect every chunk's parameters before invoking anything.
    pub wizard: bool,
    /// Prompt for required parameters that were not supplied.
    pub interactive: bool,
    /// Log recipe comments and collect them in the run report.
    pub echo_comments: bool,
}

impl ExecOptions {
    /// Wizard mode implies interactive prompting.
    pub fn prompts(&self) -> bool {
        self.interactive || self.wizard
    }

    /// Options for background runs: never interactive.
    pub fn background() -> Self {
        Self::default()
    }
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Every invocation result in order, including `null`s.
    pub results: Vec<Value>,
    /// Result of the last invocation.
    pub last: Option<Value>,
    /// Rendered recipe comments, when echoing is enabled.
    pub comments: Vec<String>,
}

impl RunReport {
    /// Append `other`, keeping the later `last` when it produced results.
    pub fn absorb(&mut self, other: RunReport) {
        if !other.results.is_empty() {
            self.last = other.last;
        }
        self.results.extend(other.results);
        self.comments.extend(other.comments);
    }
}

/// A resolved and bound command waiting to be invoked.
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub command: Arc<Command>,
    pub path: Vec<String>,
    pub args: BoundArgs,
}

impl PreparedCall {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone)]
enum Planned {
    Call(PreparedCall),
    /// Chunk whose first token named a recipe instead of a capability.
    Recipe {
        name: String,
        context: IndexMap<String, Value>,
    },
}

#[derive(Default)]
struct RunState {
    report: RunReport,
    executed: Vec<Planned>,
    last_namespace: Option<(String, Arc<Namespace>)>,
}

/// Runs chunks against an [`Engine`].
pub struct Executor {
    engine: Arc<Engine>,
    options: ExecOptions,
    origin: Origin,
}

impl Executor {
    pub fn new(engine: Arc<Engine>, options: ExecOptions, origin: Origin) -> Self {
        Self {
            engine,
            options,
            origin,
        }
    }

    /// Execute `chunks` in order. The first error aborts the run.
    pub fn run(&self, chunks: &[CommandChunk]) -> Result<RunReport, EngineError> {
        let mut state = RunState::default();
        let mut deferred = Vec::new();

        for chunk in chunks {
            if let Some(comment) = chunk.comment() {
                self.echo_comment(comment, &mut state.report);
            }
            if chunk.tokens().is_empty() {
                continue;
            }
            debug!(tokens = ?chunk.tokens(), origin = ?self.origin, "Next chunk");

            let planned = self.plan(chunk.tokens(), &mut state)?;
            if self.options.wizard {
                deferred.push(planned);
                continue;
            }
            self.execute(planned, &mut state)?;
        }

        if !deferred.is_empty() {
            info!(count = deferred.len(), "All parameters collected, invoking");
            for planned in deferred {
                self.execute(planned, &mut state)?;
            }
        }

        Ok(state.report)
    }

    fn echo_comment(&self, comment: &str, report: &mut RunReport) {
        if !self.options.echo_comments || self.origin != Origin::Recipe {
            return;
        }
        let rendered = self.render_comment(comment);
        if !rendered.is_empty() {
            info!(comment = %rendered, "Recipe comment");
            report.comments.push(rendered);
        }
    }

    /// Resolve sigils in a comment; failures leave the text unchanged.
    fn render_comment(&self, text: &str) -> String {
        if !sigil::contains_sigil(text) {
            return text.to_string();
        }
        match self.engine.store().resolve_text(text) {
            Ok(rendered) => rendered,
            Err(e) => {
                debug!(error = %e, "Comment left unrendered");
                text.to_string()
            }
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        let resolver = Resolver::new(self.engine.registry());
        if self.options.wizard {
            resolver.with_fuzzy(self.engine.prompter())
        } else {
            resolver
        }
    }

    /// Resolve and bind one chunk, collecting missing parameters if prompting.
    fn plan(&self, tokens: &[String], state: &mut RunState) -> Result<Planned, EngineError> {
        let tokens = binder::join_unquoted_kwargs(tokens);
        let resolver = self.resolver();
        let mut resolution = resolver.resolve(Target::Root, &tokens)?;

        if resolution.error.is_some() && resolution.path.is_empty() {
            if let Some((name, namespace)) = &state.last_namespace {
                let retry = resolver.resolve(Target::Namespace(Arc::clone(namespace)), &tokens)?;
                if !retry.path.is_empty() {
                    debug!(namespace = %name, "Resolved relative to last namespace");
                    let mut path = vec![name.clone()];
                    path.extend(retry.path.iter().cloned());
                    resolution = Resolution { path, ..retry };
                }
            }
        }

        let command = match &resolution.target {
            Target::Command(command) => Arc::clone(command),
            _ => return self.plan_fallback(&tokens, resolution),
        };

        if let Some(first) = resolution.path.first() {
            if let Ok(Entry::Namespace(ns)) = self.engine.registry().lookup(first) {
                state.last_namespace = Some((first.clone(), ns));
            }
        }

        let mode = BindMode {
            collect_required: self.options.prompts(),
            collect_optional: self.options.wizard,
        };
        let mut args = binder::bind(
            &command,
            &resolution.remaining,
            self.engine.units(),
            self.engine.store(),
            mode,
        )?;
        if !args.missing.is_empty() {
            binder::collect_missing(&command, &mut args, self.engine.prompter())?;
        }

        Ok(Planned::Call(PreparedCall {
            command,
            path: resolution.path,
            args,
        }))
    }

    /// A chunk that did not reach a command: try a recipe of that name, then
    /// report why resolution failed.
    fn plan_fallback(
        &self,
        tokens: &[String],
        resolution: Resolution,
    ) -> Result<Planned, EngineError> {
        if resolution.error.is_some() && resolution.path.is_empty() {
            if let Ok(path) = self.engine.recipes().locate(&tokens[0]) {
                debug!(recipe = %path.display(), "Falling back to recipe");
                return Ok(Planned::Recipe {
                    name: tokens[0].clone(),
                    context: parse_recipe_context(&tokens[1..])?,
                });
            }
        }

        if let Some(reason) = resolution.error {
            let token = resolution
                .remaining
                .first()
                .cloned()
                .unwrap_or_else(|| tokens[0].clone());
            return Err(EngineError::UnresolvedCommand {
                token,
                path: resolution.path,
                reason,
            });
        }

        let available = match &resolution.target {
            Target::Namespace(ns) => ns.names(),
            _ => self.engine.registry().names(),
        };
        Err(EngineError::NotCallable {
            path: resolution.path,
            available,
        })
    }

    fn execute(&self, planned: Planned, state: &mut RunState) -> Result<(), EngineError> {
        match self.invoke(&planned, &mut state.report)? {
            Some(directive) => self.repeat(&directive, state),
            None => {
                state.executed.push(planned);
                Ok(())
            }
        }
    }

    /// Invoke a planned item, returning a repeat directive if one was produced.
    fn invoke(
        &self,
        planned: &Planned,
        report: &mut RunReport,
    ) -> Result<Option<RepeatDirective>, EngineError> {
        match planned {
            Planned::Call(call) => self.invoke_call(call, report),
            Planned::Recipe { name, context } => {
                info!(recipe = %name, "Executing recipe in place of command");
                let nested = self
                    .engine
                    .run_nested_recipe(name, context.clone(), self.options)?;
                report.absorb(nested);
                Ok(None)
            }
        }
    }

    fn invoke_call(
        &self,
        call: &PreparedCall,
        report: &mut RunReport,
    ) -> Result<Option<RepeatDirective>, EngineError> {
        let store = self.engine.store();
        let args = self.resolve_args(&call.args)?;
        for (key, value) in &args.named {
            if !value.is_null() {
                store.set(key.clone(), value.clone());
            }
        }

        let path = call.path_string();
        debug!(path = %path, args = ?args, "Invoking");
        let outcome = call
            .command
            .invoke(Call::new(path.clone(), args, Arc::clone(&self.engine)))
            .map_err(|e| invocation_error(&path, call.command.module(), e))?;

        match outcome {
            Outcome::Repeat(directive) => Ok(Some(directive)),
            Outcome::Value(value) => {
                if !value.is_null() {
                    store.record_result(call.command.name(), value.clone());
                    store.merge_value(&value);
                }
                report.results.push(value.clone());
                report.last = Some(value);
                Ok(None)
            }
        }
    }

    /// Resolve sigils in bound values against the live store.
    fn resolve_args(&self, args: &BoundArgs) -> Result<BoundArgs, EngineError> {
        let store = self.engine.store();
        let mut resolved = BoundArgs {
            given: args.given.clone(),
            ..Default::default()
        };
        for (key, value) in &args.named {
            resolved.named.insert(key.clone(), store.resolve_value(value)?);
        }
        for value in &args.rest {
            resolved.rest.push(store.resolve_value(value)?);
        }
        for (key, value) in &args.extra {
            resolved.extra.insert(key.clone(), store.resolve_value(value)?);
        }
        Ok(resolved)
    }

    /// Replay everything executed so far in this run.
    fn repeat(&self, directive: &RepeatDirective, state: &mut RunState) -> Result<(), EngineError> {
        if state.executed.is_empty() {
            return Err(EngineError::RepeatWithoutHistory);
        }
        let base = state.executed.clone();
        let cancel = self.engine.cancel();
        let mut remaining = directive.times;
        let mut loop_index = 0u64;

        while remaining.map_or(true, |n| n > 0) {
            if cancel.is_cancelled() {
                info!(loop_index, "Repeat cancelled");
                break;
            }
            loop_index += 1;
            if !directive.rest.is_zero() {
                debug!(rest = ?directive.rest, loop_index, "Resting before replay");
                if !cancel.wait(directive.rest) {
                    info!(loop_index, "Repeat cancelled during rest");
                    break;
                }
            }
            for planned in &base {
                if self.invoke(planned, &mut state.report)?.is_some() {
                    warn!("Ignoring repeat produced during replay");
                }
            }
            if let Some(n) = remaining.as_mut() {
                *n -= 1;
            }
        }
        Ok(())
    }
}

fn invocation_error(path: &str, module: &str, err: anyhow::Error) -> EngineError {
    match err.downcast::<EngineError>() {
        Ok(inner) => inner,
        Err(err) => {
            let message = format!("{:#}", err);
            error!(path, module, error = %message, "Invocation failed");
            EngineError::Invocation {
                path: path.to_string(),
                module: module.to_string(),
                message,
            }
        }
    }
}
