//! Configuration System
//!
//! Layered configuration for recipe lookup, execution modes, side queues and
//! logging. Sources are merged by [`ConfigLoader`]; environment variables
//! prefixed with `GANTRY__` win over files.

use crate::logging::LoggingConfig;
use crate::side::DEFAULT_QUEUE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GantryConfig {
    /// Recipe search paths and extensions
    #[serde(default)]
    pub recipes: RecipeConfig,

    /// Default execution modes
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Side queue settings
    #[serde(default)]
    pub side: SideConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where recipes are looked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Search directories; relative entries are joined onto the workspace root.
    #[serde(default = "default_recipe_paths")]
    pub paths: Vec<PathBuf>,

    /// Extensions tried when a recipe name has none.
    #[serde(default = "default_recipe_extensions")]
    pub extensions: Vec<String>,
}

pub(crate) fn default_recipe_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("recipes")]
}

pub(crate) fn default_recipe_extensions() -> Vec<String> {
    vec!["recipe".to_string(), "txt".to_string()]
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            paths: default_recipe_paths(),
            extensions: default_recipe_extensions(),
        }
    }
}

impl RecipeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.paths.is_empty() {
            return Err("At least one recipe path is required".to_string());
        }
        if let Some(bad) = self
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(format!(
                "Recipe extension '{}' must be non-empty and given without a leading dot",
                bad
            ));
        }
        Ok(())
    }
}

/// Execution modes applied when the caller does not override them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Collect every parameter interactively before running anything
    #[serde(default)]
    pub wizard: bool,

    /// Prompt for missing required parameters instead of failing
    #[serde(default)]
    pub interactive: bool,

    /// Log recipe comments as they are reached
    #[serde(default = "default_true")]
    pub echo_comments: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            wizard: false,
            interactive: false,
            echo_comments: true,
        }
    }
}

/// Side queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideConfig {
    /// Queue used when `side` is given no queue names
    #[serde(default = "default_queue")]
    pub default_queue: String,
}

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            default_queue: default_queue(),
        }
    }
}

impl SideConfig {
    fn validate(&self) -> Result<(), String> {
        let name = self.default_queue.trim();
        if name.is_empty() {
            return Err("Default queue name cannot be empty".to_string());
        }
        if name.ends_with(':') {
            return Err(format!(
                "Default queue name '{}' must not end with ':'",
                self.default_queue
            ));
        }
        Ok(())
    }
}

/// Validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Recipes: {0}")]
    Recipes(String),

    #[error("Side queues: {0}")]
    Side(String),

    #[error("Logging: {0}")]
    Logging(String),
}

impl GantryConfig {
    /// Validate the entire configuration, reporting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.recipes.validate() {
            errors.push(ValidationError::Recipes(e));
        }
        if let Err(e) = self.side.validate() {
            errors.push(ValidationError::Side(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
