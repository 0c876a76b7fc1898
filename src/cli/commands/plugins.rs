//! The `plugins` command: list what would run here.

use serde::Serialize;

use crate::cli::args::PluginsArgs;
use crate::error::Result;
use crate::plugins::builtin_registry;
use crate::shell::detect_platform;

use super::dispatcher::{Command, CommandResult};

/// One plugin row in the listing.
#[derive(Debug, Serialize)]
struct PluginInfo {
    name: String,
    platforms: String,
    provides: Vec<String>,
    depends: Vec<String>,
}

/// Lists plugins discovered for the current platform.
pub struct PluginsCommand {
    args: PluginsArgs,
}

impl PluginsCommand {
    /// Create the command.
    pub fn new(args: PluginsArgs) -> Self {
        Self { args }
    }
}

impl Command for PluginsCommand {
    fn execute(&self) -> Result<CommandResult> {
        let registry = builtin_registry();
        let platform = detect_platform();

        let infos: Vec<PluginInfo> = registry
            .discover(platform)
            .iter()
            .map(|plugin| PluginInfo {
                name: plugin.name().to_string(),
                platforms: plugin.filter().describe(),
                provides: plugin.provides().iter().map(|p| p.to_string()).collect(),
                depends: plugin.depends().iter().map(|p| p.to_string()).collect(),
            })
            .collect();

        if self.args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&infos).map_err(anyhow::Error::from)?
            );
        } else {
            for info in &infos {
                let depends = if info.depends.is_empty() {
                    String::new()
                } else {
                    format!("  depends: {}", info.depends.join(", "))
                };
                println!(
                    "{:<16} provides: {}{}",
                    info.name,
                    info.provides.join(", "),
                    depends
                );
            }
            for rejected in registry.rejected() {
                eprintln!("rejected: {} ({})", rejected.plugin, rejected.reason);
            }
        }

        Ok(CommandResult::success())
    }
}
