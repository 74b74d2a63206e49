//! Engine: the capability registry, context store, recipe loader, prompter and
//! side queues of one execution session, plus the entry points that run
//! chunks, lines and recipes against them.

use crate::capability::{builtins, Command, Namespace, PluginSource, Registry};
use crate::config::GantryConfig;
use crate::error::EngineError;
use crate::executor::{CancelToken, ExecOptions, Executor, Origin, RunReport};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::recipe::{split_line_chunks, CommandChunk, RecipeLoader};
use crate::side::{SideScheduler, SideStatus, DEFAULT_QUEUE};
use crate::store::ContextStore;
use crate::units::UnitRegistry;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Shared state for one execution session.
///
/// Always handled as `Arc<Engine>`: capability handlers and side-queue
/// workers hold their own reference.
pub struct Engine {
    registry: Registry,
    store: ContextStore,
    units: UnitRegistry,
    side: SideScheduler,
    recipes: RecipeLoader,
    prompter: Arc<dyn Prompter>,
    options: ExecOptions,
    cancel: CancelToken,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("recipes", &self.recipes)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn side(&self) -> &SideScheduler {
        &self.side
    }

    pub fn recipes(&self) -> &RecipeLoader {
        &self.recipes
    }

    pub fn prompter(&self) -> &dyn Prompter {
        self.prompter.as_ref()
    }

    pub fn options(&self) -> ExecOptions {
        self.options
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    /// Resolve sigils in `text` against the live store.
    pub fn resolve(&self, text: &str) -> Result<Option<Value>, EngineError> {
        self.store.resolve(text)
    }

    /// Clear results and context between independent runs.
    pub fn reset(&self) {
        self.store.clear();
        self.cancel.reset();
    }

    /// Run already-parsed chunks with the engine's options.
    pub fn run_chunks(
        self: &Arc<Self>,
        chunks: &[CommandChunk],
        origin: Origin,
    ) -> Result<RunReport, EngineError> {
        Executor::new(Arc::clone(self), self.options, origin).run(chunks)
    }

    /// Run a flat token list split into chunks on `-` / `;`.
    pub fn run_line(self: &Arc<Self>, tokens: &[String]) -> Result<RunReport, EngineError> {
        let chunks = split_line_chunks(tokens);
        debug!(chunks = chunks.len(), "Running command line");
        self.run_chunks(&chunks, Origin::Line)
    }

    /// Load and run a recipe, optionally restricted to one section.
    pub fn run_recipe(
        self: &Arc<Self>,
        name: &str,
        section: Option<&str>,
    ) -> Result<RunReport, EngineError> {
        let recipe = self.recipes.load(name, section)?;
        info!(recipe = %recipe.path.display(), chunks = recipe.chunks.len(), "Running recipe");
        self.run_chunks(&recipe.chunks, Origin::Recipe)
    }

    /// Run a recipe from inside another run, after merging `context`.
    pub(crate) fn run_nested_recipe(
        self: &Arc<Self>,
        name: &str,
        context: IndexMap<String, Value>,
        options: ExecOptions,
    ) -> Result<RunReport, EngineError> {
        for (key, value) in context {
            self.store.set(key, value);
        }
        let recipe = self.recipes.load(name, None)?;
        Executor::new(Arc::clone(self), options, Origin::Recipe).run(&recipe.chunks)
    }

    /// Run a single background chunk; never prompts.
    pub fn run_side(self: &Arc<Self>, tokens: &[String]) -> Result<RunReport, EngineError> {
        let chunk = CommandChunk::new(tokens.to_vec());
        Executor::new(Arc::clone(self), ExecOptions::background(), Origin::Side).run(&[chunk])
    }

    /// Schedule `tokens` on the side queues.
    pub fn enqueue_side(
        self: &Arc<Self>,
        queues: &[String],
        tokens: &[String],
        when: Option<&str>,
    ) -> SideStatus {
        self.side.enqueue(self, queues, tokens, when)
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    builtins: Namespace,
    sources: Vec<Box<dyn PluginSource>>,
    units: UnitRegistry,
    recipes: RecipeLoader,
    prompter: Arc<dyn Prompter>,
    options: ExecOptions,
    default_queue: String,
    context: IndexMap<String, Value>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            builtins: builtins::builtins(),
            sources: Vec::new(),
            units: UnitRegistry::with_defaults(),
            recipes: RecipeLoader::default(),
            prompter: Arc::new(TerminalPrompter),
            options: ExecOptions::default(),
            default_queue: DEFAULT_QUEUE.to_string(),
            context: IndexMap::new(),
        }
    }
}

impl EngineBuilder {
    /// Apply recipe, executor and side-queue settings from configuration.
    pub fn config(mut self, config: &GantryConfig, workspace: &Path) -> Self {
        self.recipes = RecipeLoader::from_config(&config.recipes, workspace);
        self.options = ExecOptions {
            wizard: config.executor.wizard,
            interactive: config.executor.interactive,
            echo_comments: config.executor.echo_comments,
        };
        self.default_queue = config.side.default_queue.clone();
        self
    }

    /// Register an extra root-level command next to the built-ins.
    pub fn with_command(mut self, command: Command) -> Self {
        self.builtins.add_command(command);
        self
    }

    /// Register an extra root-level namespace next to the built-ins.
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.builtins.add_namespace(namespace);
        self
    }

    pub fn plugin_source(mut self, source: Box<dyn PluginSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn units(mut self, units: UnitRegistry) -> Self {
        self.units = units;
        self
    }

    pub fn recipes(mut self, recipes: RecipeLoader) -> Self {
        self.recipes = recipes;
        self
    }

    pub fn prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn default_queue(mut self, name: &str) -> Self {
        self.default_queue = name.to_string();
        self
    }

    /// Initial context map entries.
    pub fn context(mut self, context: IndexMap<String, Value>) -> Self {
        self.context.extend(context);
        self
    }

    pub fn build(self) -> Arc<Engine> {
        let mut registry = Registry::new(self.builtins);
        for source in self.sources {
            registry.add_source(source);
        }
        Arc::new(Engine {
            registry,
            store: ContextStore::with_context(self.context),
            units: self.units,
            side: SideScheduler::new(&self.default_queue),
            recipes: self.recipes,
            prompter: self.prompter,
            options: self.options,
            cancel: CancelToken::new(),
        })
    }
}
