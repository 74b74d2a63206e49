//! Integration tests for the Gantry command-chain engine

mod config_integration;
mod executor_chain;
mod recipe_runs;
mod side_queues;
mod sigil_context;
mod support;
mod wizard;
