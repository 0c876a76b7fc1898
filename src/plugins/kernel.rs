//! Kernel identification via uname.

use crate::error::{ReconError, Result};
use crate::plugin::{PlatformFilter, Plugin, PluginContext};

/// The kernel plugin definition.
pub fn plugin() -> Result<Plugin> {
    Plugin::builder("kernel")
        .provides("kernel")
        .platforms(PlatformFilter::Unix)
        .body(run)
        .build()
}

fn run(ctx: &mut PluginContext<'_>) -> Result<()> {
    for (flag, key) in [
        ("-s", "kernel.name"),
        ("-r", "kernel.release"),
        ("-v", "kernel.version"),
        ("-m", "kernel.machine"),
    ] {
        let command = format!("uname {}", flag);
        let output = match ctx.run(&command) {
            Ok(output) => output,
            Err(err) if err.is_unavailable() => return Ok(()),
            Err(err) => return Err(err),
        };
        if !output.success() {
            return Err(ReconError::CommandFailed {
                command,
                code: output.exit_code,
            });
        }
        if let Some(value) = output.stdout.first() {
            ctx.set(key, value.trim())?;
        }
    }
    Ok(())
}
