//! CLI parse: clap types for Gantry. No behavior; definitions only.

use clap::Parser;
use std::path::PathBuf;

/// Gantry CLI - run command chains, recipes and side queues
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(about = "Run command chains and recipes against a shared context")]
pub struct Cli {
    /// Recipe to execute (repeatable; recipes run in order)
    #[arg(short = 'r', long = "recipe", value_name = "NAME")]
    pub recipes: Vec<String>,

    /// Only run this section of the recipe (plus its prelude)
    #[arg(long, requires = "recipes")]
    pub section: Option<String>,

    /// Collect every parameter interactively before running anything
    #[arg(short, long)]
    pub wizard: bool,

    /// Prompt for missing required parameters
    #[arg(short, long)]
    pub interactive: bool,

    /// Resolve this sigil expression after the run and print it instead
    #[arg(short = 'e', long = "expression", value_name = "TEXT")]
    pub expression: Option<String>,

    /// Print output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Print every result instead of only the last one
    #[arg(short, long)]
    pub all: bool,

    /// List available capabilities and exit
    #[arg(short, long)]
    pub list: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub show_config: bool,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Command tokens; chain commands with `-` or `;`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub tokens: Vec<String>,
}
