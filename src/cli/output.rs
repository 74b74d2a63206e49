//! CLI output: error mapping from engine errors to stable CLI surface.

use crate::error::EngineError;
use owo_colors::OwoColorize;

/// Map engine errors to a string for CLI output.
pub fn map_error(e: &EngineError) -> String {
    let mut message = format!("{} {}", "error:".red().bold(), e);
    match e {
        EngineError::RecipeNotFound { tried } => {
            message.push_str(&format!("\n{}", "tried:".dimmed()));
            for path in tried {
                message.push_str(&format!("\n  {}", path));
            }
        }
        EngineError::MissingArgument { .. } => {
            message.push_str(&format!(
                "\n{}",
                "hint: pass the value or rerun with --interactive".yellow()
            ));
        }
        _ => {}
    }
    message
}
