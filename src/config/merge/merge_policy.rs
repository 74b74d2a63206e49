//! Merge rules: defaults, override order, conflict handling.

use crate::side::DEFAULT_QUEUE;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("recipes.paths", vec!["recipes"])?
        .set_default("recipes.extensions", vec!["recipe", "txt"])?
        .set_default("executor.wizard", false)?
        .set_default("executor.interactive", false)?
        .set_default("executor.echo_comments", true)?
        .set_default("side.default_queue", DEFAULT_QUEUE)?
        .set_default("logging.level", "info")
}
