//! LSB release detection (Linux).
//!
//! Reads `/etc/lsb-release` when present, otherwise falls back to the
//! `lsb_release -a` command. When neither source exists the `lsb`
//! namespace stays entirely absent — "not detected", not an empty
//! mapping.

use std::path::Path;

use regex::Regex;

use crate::error::{ReconError, Result};
use crate::plugin::{PlatformFilter, Plugin, PluginContext};
use crate::shell::Platform;
use crate::tree::AttributeValue;

const LSB_RELEASE_FILE: &str = "/etc/lsb-release";
const LSB_RELEASE_COMMAND: &str = "lsb_release -a";

/// The lsb plugin definition.
pub fn plugin() -> Result<Plugin> {
    Plugin::builder("lsb")
        .provides("lsb")
        .platforms(PlatformFilter::Only(vec![Platform::Linux]))
        .body(run)
        .build()
}

fn run(ctx: &mut PluginContext<'_>) -> Result<()> {
    let file = Path::new(LSB_RELEASE_FILE);
    if ctx.file_exists(file) {
        let lines = ctx.read_lines(file)?;
        ctx.set("lsb", AttributeValue::map())?;
        for line in lines {
            parse_release_file_line(ctx, &line)?;
        }
        return Ok(());
    }

    let output = match ctx.run(LSB_RELEASE_COMMAND) {
        Ok(output) => output,
        Err(err) if err.is_unavailable() => return Ok(()),
        Err(err) => return Err(err),
    };
    if !output.success() {
        return Err(ReconError::CommandFailed {
            command: LSB_RELEASE_COMMAND.to_string(),
            code: output.exit_code,
        });
    }

    ctx.set("lsb", AttributeValue::map())?;
    for (pattern, key) in [
        (r"^Distributor ID:\s+(.+)$", "lsb.id"),
        (r"^Description:\s+(.+)$", "lsb.description"),
        (r"^Release:\s+(.+)$", "lsb.release"),
        (r"^Codename:\s+(.+)$", "lsb.codename"),
    ] {
        let Ok(re) = Regex::new(pattern) else { continue };
        for line in &output.stdout {
            if let Some(caps) = re.captures(line) {
                if let Some(m) = caps.get(1) {
                    ctx.set(key, m.as_str().trim())?;
                }
            }
        }
    }
    Ok(())
}

/// Parse one `KEY=value` line from /etc/lsb-release. Values keep their
/// case as provided; surrounding quotes are stripped.
fn parse_release_file_line(ctx: &mut PluginContext<'_>, line: &str) -> Result<()> {
    let Some((key, value)) = line.split_once('=') else {
        return Ok(());
    };
    let value = value.trim().trim_matches('"').trim_matches('\'');

    match key.trim() {
        "DISTRIB_ID" => ctx.set("lsb.id", value),
        "DISTRIB_RELEASE" => ctx.set("lsb.release", value),
        "DISTRIB_CODENAME" => ctx.set("lsb.codename", value),
        "DISTRIB_DESCRIPTION" => ctx.set("lsb.description", value),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;

    use super::*;
    use crate::shell::ScriptedRunner;
    use crate::tree::AttributeTree;

    fn run_with(runner: &ScriptedRunner) -> AttributeTree {
        let plugin = plugin().unwrap();
        let tree = RwLock::new(AttributeTree::new());
        let mut ctx = PluginContext::new(&plugin, &tree, runner);
        plugin.run(&mut ctx).unwrap();
        tree.into_inner().unwrap()
    }

    fn get<'a>(tree: &'a AttributeTree, path: &str) -> Option<&'a str> {
        tree.get(&path.parse().unwrap()).and_then(|v| v.as_str())
    }

    #[test]
    fn release_file_sets_all_attributes() {
        let runner = ScriptedRunner::new().with_file(
            "/etc/lsb-release",
            &[
                "DISTRIB_ID=Ubuntu",
                "DISTRIB_RELEASE=8.04",
                "DISTRIB_CODENAME=hardy",
                "DISTRIB_DESCRIPTION=\"Ubuntu 8.04\"",
            ],
        );

        let tree = run_with(&runner);
        assert_eq!(get(&tree, "lsb.id"), Some("Ubuntu"));
        assert_eq!(get(&tree, "lsb.release"), Some("8.04"));
        assert_eq!(get(&tree, "lsb.codename"), Some("hardy"));
        // quotes stripped
        assert_eq!(get(&tree, "lsb.description"), Some("Ubuntu 8.04"));
    }

    #[test]
    fn release_file_wins_over_command() {
        let runner = ScriptedRunner::new()
            .with_file("/etc/lsb-release", &["DISTRIB_ID=Ubuntu"])
            .with_command(LSB_RELEASE_COMMAND, 0, &["Distributor ID: CentOS"]);

        let tree = run_with(&runner);
        assert_eq!(get(&tree, "lsb.id"), Some("Ubuntu"));
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn command_output_sets_all_attributes() {
        let runner = ScriptedRunner::new().with_command(
            LSB_RELEASE_COMMAND,
            0,
            &[
                "LSB Version: :core-3.1-ia32:core-3.1-noarch",
                "Distributor ID: CentOS",
                "Description:  CentOS release 5.4 (Final)",
                "Release:  5.4",
                "Codename: Final",
            ],
        );

        let tree = run_with(&runner);
        assert_eq!(get(&tree, "lsb.id"), Some("CentOS"));
        assert_eq!(get(&tree, "lsb.release"), Some("5.4"));
        assert_eq!(get(&tree, "lsb.codename"), Some("Final"));
        assert_eq!(get(&tree, "lsb.description"), Some("CentOS release 5.4 (Final)"));
    }

    #[test]
    fn command_output_tolerates_wide_padding() {
        let runner = ScriptedRunner::new().with_command(
            LSB_RELEASE_COMMAND,
            0,
            &[
                "LSB Version:    :core-4.0-ia32:core-4.0-noarch",
                "Distributor ID: Fedora",
                "Description:    Fedora release 14 (Laughlin)",
                "Release:        14",
                "Codename:       Laughlin",
            ],
        );

        let tree = run_with(&runner);
        assert_eq!(get(&tree, "lsb.id"), Some("Fedora"));
        assert_eq!(get(&tree, "lsb.release"), Some("14"));
        assert_eq!(get(&tree, "lsb.codename"), Some("Laughlin"));
    }

    #[test]
    fn no_sources_leaves_namespace_absent() {
        let runner = ScriptedRunner::new();
        let tree = run_with(&runner);
        assert!(tree.get(&"lsb".parse().unwrap()).is_none());
    }

    #[test]
    fn nonzero_exit_is_a_runtime_failure_with_no_attributes() {
        // Policy: a present-but-failing command is a plugin failure, even
        // if its stdout would have matched.
        let runner = ScriptedRunner::new().with_command(
            LSB_RELEASE_COMMAND,
            1,
            &["Distributor ID: CentOS"],
        );

        let plugin = plugin().unwrap();
        let tree = RwLock::new(AttributeTree::new());
        let mut ctx = PluginContext::new(&plugin, &tree, &runner);
        let err = plugin.run(&mut ctx).unwrap_err();

        assert!(matches!(err, ReconError::CommandFailed { .. }));
        assert!(tree.into_inner().unwrap().is_empty());
    }
}
