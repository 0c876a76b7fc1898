//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::engine::{EngineConfig, ScheduleMode};

/// recon - Host fact gathering with dependency-aware detection plugins.
#[derive(Debug, Parser)]
#[command(name = "recon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Maximum plugins executing concurrently
    #[arg(long, global = true, env = "RECON_WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Whole-run deadline in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Per-plugin deadline in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub plugin_timeout: Option<u64>,

    /// Use lazy (demand-driven) scheduling instead of eager
    #[arg(long, global = true)]
    pub lazy: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Engine options derived from the global flags.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            workers: self.workers.max(1),
            plugin_timeout: self.plugin_timeout.map(Duration::from_secs),
            run_timeout: self.timeout.map(Duration::from_secs),
            mode: if self.lazy {
                ScheduleMode::Lazy
            } else {
                ScheduleMode::Eager
            },
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a collection and print the attribute tree (default)
    Collect(CollectArgs),

    /// List plugins applicable on this platform
    Plugins(PluginsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `collect` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CollectArgs {
    /// Print only the subtree at this attribute path (e.g. "lsb.id")
    pub attribute: Option<String>,

    /// Print the full run report (status, failures, timings) instead of
    /// just the tree
    #[arg(long)]
    pub report: bool,
}

/// Arguments for the `plugins` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PluginsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
