//! The `collect` command: one full collection run.

use crate::cli::args::{Cli, CollectArgs};
use crate::engine::{Collector, RunStatus};
use crate::error::Result;
use crate::output;
use crate::plugins::builtin_registry;
use crate::shell::SystemRunner;
use crate::tree::AttributePath;

use super::dispatcher::{Command, CommandResult};

/// Runs a collection and prints the tree (or a subtree, or the report).
pub struct CollectCommand {
    args: CollectArgs,
    config: crate::engine::EngineConfig,
    quiet: bool,
}

impl CollectCommand {
    /// Create the command from parsed CLI state.
    pub fn new(cli: &Cli, args: CollectArgs) -> Self {
        Self {
            args,
            config: cli.engine_config(),
            quiet: cli.quiet,
        }
    }

    fn exit_code_for(status: RunStatus) -> i32 {
        match status {
            RunStatus::Complete => 0,
            RunStatus::Partial => 2,
            RunStatus::Failed => 1,
        }
    }
}

impl Command for CollectCommand {
    fn execute(&self) -> Result<CommandResult> {
        let runner = SystemRunner::new();
        let report = Collector::new(builtin_registry(), &runner)
            .with_config(self.config.clone())
            .run();

        if !self.quiet {
            for failure in &report.failures {
                eprintln!("recon: plugin '{}' failed: {}", failure.plugin, failure.message);
            }
            if !report.skipped.is_empty() {
                eprintln!(
                    "recon: run deadline passed; skipped: {}",
                    report.skipped.join(", ")
                );
            }
        }

        if let Some(raw) = &self.args.attribute {
            let path = AttributePath::parse(raw)?;
            return match output::lookup(&report.tree, &path) {
                Some(value) => {
                    println!("{}", output::to_json_pretty(value)?);
                    Ok(CommandResult {
                        success: report.is_complete(),
                        exit_code: Self::exit_code_for(report.status),
                    })
                }
                None => {
                    eprintln!("recon: attribute '{}' is not set", raw);
                    Ok(CommandResult::failure(1))
                }
            };
        }

        if self.args.report {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).map_err(anyhow::Error::from)?
            );
        } else {
            println!("{}", output::to_json_pretty(&report.tree)?);
        }

        Ok(CommandResult {
            success: report.is_complete(),
            exit_code: Self::exit_code_for(report.status),
        })
    }
}
