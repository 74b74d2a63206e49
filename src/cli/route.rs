//! CLI route: run context built from configuration, and the single dispatch
//! from parsed arguments to engine runs and presentation.

use crate::cli::parse::Cli;
use crate::cli::presentation::{
    capability_rows, format_capabilities_json, format_capabilities_text, format_expression,
    format_run_json, format_run_text, OutputSelection,
};
use crate::config::{ConfigLoader, GantryConfig};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::executor::{ExecOptions, RunReport};
use crate::recipe::{looks_like_context, parse_recipe_context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace, effective configuration and
/// the engine built from it.
pub struct RunContext {
    engine: Arc<Engine>,
    workspace_root: PathBuf,
    config: GantryConfig,
}

impl RunContext {
    /// Load configuration (explicit file or layered workspace config) and
    /// build the engine. `--wizard` / `--interactive` add to the configured modes.
    pub fn from_cli(cli: &Cli) -> Result<Self, EngineError> {
        let config = match cli.config {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&cli.workspace)?,
        };
        validate_config(&config)?;

        let options = ExecOptions {
            wizard: cli.wizard || config.executor.wizard,
            interactive: cli.interactive || config.executor.interactive,
            echo_comments: config.executor.echo_comments,
        };
        let engine = Engine::builder()
            .config(&config, &cli.workspace)
            .options(options)
            .build();
        debug!(?options, workspace = %cli.workspace.display(), "Engine ready");
        Ok(Self {
            engine,
            workspace_root: cli.workspace.clone(),
            config,
        })
    }

    /// Wrap an already built engine; the recorded configuration is the default.
    pub fn with_engine(engine: Arc<Engine>, workspace_root: PathBuf) -> Self {
        Self {
            engine,
            workspace_root,
            config: GantryConfig::default(),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Run what the arguments ask for and render the output.
    pub fn execute(&self, cli: &Cli) -> Result<String, EngineError> {
        if cli.show_config {
            return ConfigLoader::render(&self.config);
        }
        if cli.list {
            let rows = capability_rows(self.engine.registry());
            return if cli.json {
                format_capabilities_json(&rows)
            } else {
                Ok(format_capabilities_text(&rows))
            };
        }

        let report = self.run(cli)?;
        // Side commands keep running after the foreground chain returns.
        self.engine.side().wait_all();

        if let Some(ref expression) = cli.expression {
            let value = self.engine.resolve(expression)?;
            return format_expression(value.as_ref(), cli.json);
        }
        let selection = if cli.all {
            OutputSelection::All
        } else {
            OutputSelection::Last
        };
        if cli.json {
            format_run_json(&report, selection)
        } else {
            format_run_text(&report, selection)
        }
    }

    fn run(&self, cli: &Cli) -> Result<RunReport, EngineError> {
        if !cli.recipes.is_empty() {
            self.merge_context(parse_recipe_context(&cli.tokens)?);
            let mut report = RunReport::default();
            for name in &cli.recipes {
                info!(recipe = %name, section = ?cli.section, "Running recipe from CLI");
                report.absorb(self.engine.run_recipe(name, cli.section.as_deref())?);
            }
            return Ok(report);
        }

        if cli.tokens.is_empty() {
            if cli.expression.is_some() {
                return Ok(RunReport::default());
            }
            return Err(EngineError::InvalidArgument(
                "Nothing to run: pass command tokens or --recipe".to_string(),
            ));
        }

        if looks_like_context(&cli.tokens) {
            debug!(tokens = ?cli.tokens, "Arguments are context only");
            self.merge_context(parse_recipe_context(&cli.tokens)?);
            return Ok(RunReport::default());
        }

        self.engine.run_line(&cli.tokens)
    }

    fn merge_context(&self, context: indexmap::IndexMap<String, serde_json::Value>) {
        for (key, value) in context {
            self.engine.store().set(key, value);
        }
    }
}

fn validate_config(config: &GantryConfig) -> Result<(), EngineError> {
    config.validate().map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        EngineError::Config(messages.join("; "))
    })
}
