//! Subcommand implementations

pub mod members;
pub mod trace;
