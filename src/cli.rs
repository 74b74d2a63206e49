//! CLI domain: parse, route, output, and presentation only.
//! Engine orchestration stays in the library; the route dispatches to it.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::Cli;
pub use presentation::{
    capability_rows, format_capabilities_json, format_capabilities_text, format_expression,
    format_run_json, format_run_text, format_value_text, CapabilityRow, OutputSelection,
};
pub use route::RunContext;
