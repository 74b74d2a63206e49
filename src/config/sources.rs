//! Configuration sources in merge order.

pub mod environment;
pub mod global_file;
pub mod workspace_file;
