//! Config loading entry point: merges defaults, files and environment.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::GantryConfig;
use crate::error::EngineError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`GantryConfig`] from the layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for `workspace_root`.
    ///
    /// Precedence, lowest first: defaults, global file, `config/config.toml`,
    /// `config/{GANTRY_ENV}.toml`, `GANTRY__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<GantryConfig, EngineError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: GantryConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration from one explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<GantryConfig, EngineError> {
        if !path.exists() {
            return Err(EngineError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = environment::add_to_builder(builder);
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Path of the user-level config file.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Render `config` as TOML, in the layout the config files use.
    pub fn render(config: &GantryConfig) -> Result<String, EngineError> {
        toml::to_string_pretty(config)
            .map_err(|e| EngineError::Config(format!("Failed to render configuration: {}", e)))
    }
}
