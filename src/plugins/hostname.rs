//! Hostname detection.

use crate::error::Result;
use crate::plugin::{PlatformFilter, Plugin, PluginContext};

/// The hostname plugin definition.
pub fn plugin() -> Result<Plugin> {
    Plugin::builder("hostname")
        .provides("hostname")
        .provides("fqdn")
        .platforms(PlatformFilter::Unix)
        .body(run)
        .build()
}

fn run(ctx: &mut PluginContext<'_>) -> Result<()> {
    let output = match ctx.run("hostname") {
        Ok(output) => output,
        Err(err) if err.is_unavailable() => return Ok(()),
        Err(err) => return Err(err),
    };
    if output.success() {
        if let Some(name) = output.stdout.first() {
            ctx.set("hostname", name.trim())?;
        }
    }

    // A host without a configured domain exits non-zero here; that is
    // "no fqdn", not a plugin failure.
    if let Ok(output) = ctx.run("hostname --fqdn") {
        if output.success() {
            if let Some(fqdn) = output.stdout.first() {
                ctx.set("fqdn", fqdn.trim())?;
            }
        }
    }
    Ok(())
}
