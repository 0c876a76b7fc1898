//! Platform name/version/family derivation (Linux).
//!
//! Prefers lsb data when the lsb plugin populated it — this is the
//! dependency edge the scheduler orders — and falls back to distribution
//! release files, then to the pre-seeded OS identifier.

use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::plugin::{PlatformFilter, Plugin, PluginContext};
use crate::shell::Platform;

const DEBIAN_VERSION_FILE: &str = "/etc/debian_version";
const REDHAT_RELEASE_FILE: &str = "/etc/redhat-release";

/// The platform plugin definition.
pub fn plugin() -> Result<Plugin> {
    Plugin::builder("platform")
        .provides("platform.name")
        .provides("platform.version")
        .provides("platform.family")
        .depends("lsb.id")
        .depends("lsb.release")
        .platforms(PlatformFilter::Only(vec![Platform::Linux]))
        .body(run)
        .build()
}

fn run(ctx: &mut PluginContext<'_>) -> Result<()> {
    if let Some(id) = ctx.get("lsb.id").and_then(|v| v.as_str().map(String::from)) {
        let name = id.to_lowercase();
        if let Some(release) = ctx
            .get("lsb.release")
            .and_then(|v| v.as_str().map(String::from))
        {
            ctx.set("platform.version", release)?;
        }
        ctx.set("platform.family", family_of(&name))?;
        ctx.set("platform.name", name)?;
        return Ok(());
    }

    let debian = Path::new(DEBIAN_VERSION_FILE);
    if ctx.file_exists(debian) {
        ctx.set("platform.name", "debian")?;
        ctx.set("platform.family", "debian")?;
        if let Some(version) = ctx.read_lines(debian)?.first() {
            ctx.set("platform.version", version.trim())?;
        }
        return Ok(());
    }

    let redhat = Path::new(REDHAT_RELEASE_FILE);
    if ctx.file_exists(redhat) {
        if let Some(line) = ctx.read_lines(redhat)?.first() {
            let name = line
                .split_whitespace()
                .next()
                .unwrap_or("redhat")
                .to_lowercase();
            ctx.set("platform.family", family_of(&name))?;
            ctx.set("platform.name", name)?;
            if let Ok(re) = Regex::new(r"release ([\d.]+)") {
                if let Some(caps) = re.captures(line) {
                    if let Some(m) = caps.get(1) {
                        ctx.set("platform.version", m.as_str())?;
                    }
                }
            }
        }
        return Ok(());
    }

    // Nothing distribution-specific detected; fall back to the seeded
    // OS identifier so platform.name is never missing on a known OS.
    if let Some(os) = ctx.get("platform.os").and_then(|v| v.as_str().map(String::from)) {
        ctx.set("platform.family", os.clone())?;
        ctx.set("platform.name", os)?;
    }
    Ok(())
}

fn family_of(name: &str) -> &'static str {
    match name {
        "ubuntu" | "debian" | "linuxmint" => "debian",
        "centos" | "redhat" | "fedora" | "oracle" | "scientific" | "amazon" => "rhel",
        "suse" | "opensuse" => "suse",
        _ => "linux",
    }
}
