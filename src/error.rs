//! Error types for the Gantry command-chain engine.

use thiserror::Error;

/// Errors that abort a run.
///
/// None of these are swallowed by the executor; background side commands are
/// the only place where they are caught and logged instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Recipe not found (tried {} candidates)", tried.len())]
    RecipeNotFound { tried: Vec<String> },

    #[error("Section '{section}' not found in recipe {recipe}")]
    RecipeSectionNotFound { section: String, recipe: String },

    #[error("Unresolved command '{token}' after '{}': {reason}", path.join(" "))]
    UnresolvedCommand {
        token: String,
        path: Vec<String>,
        reason: String,
    },

    #[error("Object at path '{}' is not callable. Available: {}", path.join(" "), available.join(", "))]
    NotCallable {
        path: Vec<String>,
        available: Vec<String>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expected a value after `{0}`")]
    MissingValueForFlag(String),

    #[error("Missing required argument '{param}' for {command}")]
    MissingArgument { command: String, param: String },

    #[error("repeat requires at least one prior command to replay")]
    RepeatWithoutHistory,

    #[error("Invalid sigil '{0}': key and fallback cannot both be empty")]
    InvalidSigil(String),

    #[error("Unhandled error in {path} -> {message} @ {module}")]
    Invocation {
        path: String,
        module: String,
        message: String,
    },

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}
