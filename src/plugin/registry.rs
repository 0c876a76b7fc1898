//! Plugin registration and discovery.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::error::{ReconError, Result};
use crate::shell::Platform;
use crate::tree::AttributePath;

use super::Plugin;

/// A plugin definition that failed to load.
///
/// Loader failure for one malformed definition never aborts discovery of
/// the others; the rejection is recorded and the rest of the registry
/// remains usable.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedPlugin {
    /// Name of the offending plugin, as far as it could be determined.
    pub plugin: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Owns all registered plugins for one collection run.
///
/// Built fresh each run — there is no cross-run caching, so stale
/// dependency indexes cannot occur. Indexed by name for direct lookup and
/// by provided path for dependency resolution.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: Vec<Plugin>,
    by_name: HashMap<String, usize>,
    /// Provider index keyed by the first path segment: all provides
    /// declarations sharing a namespace root, with their plugin's slot.
    by_provided: HashMap<String, Vec<(AttributePath, usize)>>,
    rejected: Vec<RejectedPlugin>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a plugin definition, recording instead of propagating failures.
    ///
    /// Accepts the output of [`Plugin::builder`]'s `build()` directly so a
    /// malformed definition lands in the rejected list. A duplicate name or
    /// a provides path overlapping an already-registered plugin's namespace
    /// is rejected the same way — the provider index must stay unambiguous.
    pub fn load(&mut self, plugin: Result<Plugin>) {
        match plugin {
            Ok(plugin) => {
                if let Err(rejection) = self.check_registrable(&plugin) {
                    warn!("Rejected plugin '{}': {}", rejection.plugin, rejection.reason);
                    self.rejected.push(rejection);
                    return;
                }
                let slot = self.plugins.len();
                self.by_name.insert(plugin.name().to_string(), slot);
                for provided in plugin.provides() {
                    self.by_provided
                        .entry(provided.head().to_string())
                        .or_default()
                        .push((provided.clone(), slot));
                }
                self.plugins.push(plugin);
            }
            Err(err) => {
                let plugin = match &err {
                    ReconError::InvalidPlugin { plugin, .. } => plugin.clone(),
                    _ => "<unknown>".to_string(),
                };
                warn!("Rejected plugin '{}': {}", plugin, err);
                self.rejected.push(RejectedPlugin {
                    plugin,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn check_registrable(&self, plugin: &Plugin) -> std::result::Result<(), RejectedPlugin> {
        if self.by_name.contains_key(plugin.name()) {
            return Err(RejectedPlugin {
                plugin: plugin.name().to_string(),
                reason: "duplicate plugin name".to_string(),
            });
        }
        for provided in plugin.provides() {
            let Some(entries) = self.by_provided.get(provided.head()) else {
                continue;
            };
            if let Some((conflict, slot)) =
                entries.iter().find(|(p, _)| p.overlaps(provided))
            {
                return Err(RejectedPlugin {
                    plugin: plugin.name().to_string(),
                    reason: format!(
                        "provides '{}' overlaps '{}' from plugin '{}'",
                        provided,
                        conflict,
                        self.plugins[*slot].name()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Look up a plugin by name.
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.by_name.get(name).map(|&i| &self.plugins[i])
    }

    /// The plugin providing `path`, if any.
    ///
    /// A provider matches when its declared provides namespace overlaps the
    /// requested path: a dependency on `lsb.id` resolves to the plugin
    /// providing `lsb`.
    pub fn provider_of(&self, path: &AttributePath) -> Option<&Plugin> {
        self.by_provided
            .get(path.head())?
            .iter()
            .find(|(provided, _)| provided.overlaps(path))
            .map(|&(_, slot)| &self.plugins[slot])
    }

    /// All plugins applicable on `platform`, in registration order.
    pub fn discover(&self, platform: Platform) -> Vec<&Plugin> {
        self.plugins
            .iter()
            .filter(|plugin| plugin.applies_to(platform))
            .collect()
    }

    /// Definitions that failed to load.
    pub fn rejected(&self) -> &[RejectedPlugin] {
        &self.rejected
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
