//! Environment source: GANTRY__SECTION__KEY overrides.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

/// `GANTRY__EXECUTOR__WIZARD=true` sets `executor.wizard`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("GANTRY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("recipes.paths")
            .with_list_parse_key("recipes.extensions"),
    )
}
