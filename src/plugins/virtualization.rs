//! Virtualization detection.
//!
//! An ordered table of probes, each a source (command or file) plus a
//! fixed pattern table mapping output to a `(system, role)` pair. Probes
//! whose source is unavailable are skipped; the first matching pattern
//! wins and stops further evaluation.
//!
//! Namespace semantics: when the plugin runs, `virtualization` is always
//! written — as an empty mapping when every available probe came up
//! empty ("checked, nothing found"). The `system`/`role` leaves appear
//! only on a match. If the plugin never runs, the namespace is absent
//! ("not checked").

use std::path::Path;

use regex::Regex;

use crate::error::{ReconError, Result};
use crate::plugin::{PlatformFilter, Plugin, PluginContext};
use crate::tree::AttributeValue;

enum ProbeSource {
    Command(&'static str),
    File(&'static str),
}

struct ProbeRule {
    pattern: &'static str,
    system: &'static str,
    role: &'static str,
}

struct Probe {
    source: ProbeSource,
    rules: &'static [ProbeRule],
}

/// Probes in evaluation order. Hypervisor identification first, then
/// firmware tables, then kernel-exposed state.
const PROBES: &[Probe] = &[
    Probe {
        source: ProbeSource::Command("/usr/sbin/psrinfo -pv"),
        rules: &[ProbeRule {
            pattern: "QEMU Virtual CPU",
            system: "kvm",
            role: "guest",
        }],
    },
    Probe {
        source: ProbeSource::Command("/usr/sbin/smbios"),
        rules: &[
            ProbeRule {
                pattern: "VMware Virtual Platform",
                system: "vmware",
                role: "guest",
            },
            ProbeRule {
                pattern: "Product: Virtual Machine",
                system: "virtualpc",
                role: "guest",
            },
            ProbeRule {
                pattern: "innotek GmbH",
                system: "vbox",
                role: "guest",
            },
            ProbeRule {
                pattern: "Parallels",
                system: "parallels",
                role: "guest",
            },
        ],
    },
    Probe {
        source: ProbeSource::File("/proc/cpuinfo"),
        rules: &[ProbeRule {
            pattern: "QEMU Virtual CPU",
            system: "kvm",
            role: "guest",
        }],
    },
    Probe {
        source: ProbeSource::File("/proc/modules"),
        rules: &[ProbeRule {
            pattern: r"(?m)^kvm",
            system: "kvm",
            role: "host",
        }],
    },
    Probe {
        source: ProbeSource::File("/sys/hypervisor/type"),
        rules: &[ProbeRule {
            pattern: "xen",
            system: "xen",
            role: "guest",
        }],
    },
];

/// The virtualization plugin definition.
pub fn plugin() -> Result<Plugin> {
    Plugin::builder("virtualization")
        .provides("virtualization")
        .platforms(PlatformFilter::Unix)
        .body(run)
        .build()
}

fn run(ctx: &mut PluginContext<'_>) -> Result<()> {
    let mut matched: Option<(&str, &str)> = None;

    'probes: for probe in PROBES {
        let text = match probe.source {
            ProbeSource::Command(command) => match ctx.run(command) {
                Ok(output) if output.success() => output.stdout_text(),
                Ok(output) => {
                    return Err(ReconError::CommandFailed {
                        command: command.to_string(),
                        code: output.exit_code,
                    });
                }
                Err(err) if err.is_unavailable() => continue,
                Err(err) => return Err(err),
            },
            ProbeSource::File(path) => {
                let path = Path::new(path);
                if !ctx.file_exists(path) {
                    continue;
                }
                ctx.read_lines(path)?.join("\n")
            }
        };

        for rule in probe.rules {
            let Ok(re) = Regex::new(rule.pattern) else { continue };
            if re.is_match(&text) {
                matched = Some((rule.system, rule.role));
                break 'probes;
            }
        }
    }

    // Written only after every probe settled: a probe failing at runtime
    // must leave the whole namespace absent, not half-written.
    ctx.set("virtualization", AttributeValue::map())?;
    if let Some((system, role)) = matched {
        ctx.set("virtualization.system", system)?;
        ctx.set("virtualization.role", role)?;
    }
    Ok(())
}
