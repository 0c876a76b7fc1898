//! Command-line interface for recon.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, CollectArgs, Commands, CompletionsArgs, PluginsArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
