//! Gantry: Command-Chain Execution Engine
//!
//! Resolves whitespace-separated command tokens against a tree of named
//! capabilities, binds their arguments, and runs them in sequence while a
//! shared context map carries results forward. Commands come from the
//! command line or from recipe files, and can be pushed onto named
//! background side queues.

pub mod binder;
pub mod capability;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod logging;
pub mod prompt;
pub mod recipe;
pub mod resolver;
pub mod side;
pub mod sigil;
pub mod store;
pub mod units;

pub use engine::{Engine, EngineBuilder};
pub use error::EngineError;
