//! Detection plugins.
//!
//! A [`Plugin`] is a named, platform-scoped detection routine: it declares
//! the attribute paths it *provides*, the paths it *depends on*, and a run
//! body that populates the tree through a [`PluginContext`]. This definition
//! interface is the extension point the whole system is built around —
//! plugin authors satisfy it and nothing else.
//!
//! Plugins never call each other. A body reads attribute paths through its
//! context and relies on the scheduler to guarantee those paths are already
//! populated (or definitively absent) before the body starts.

pub mod registry;

use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::warn;

use crate::error::{ReconError, Result};
use crate::shell::{CommandOutput, CommandRunner, Platform};
use crate::tree::{AttributePath, AttributeTree, AttributeValue};

pub use registry::{PluginRegistry, RejectedPlugin};

/// A plugin run body: a function of the current tree state plus the
/// command runner, producing tree mutations.
pub type PluginBody = Arc<dyn Fn(&mut PluginContext<'_>) -> Result<()> + Send + Sync>;

/// Which platforms a plugin applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformFilter {
    /// Applies everywhere.
    Any,
    /// Applies to all Unix-family platforms.
    Unix,
    /// Applies only to the listed platforms.
    Only(Vec<Platform>),
}

impl PlatformFilter {
    /// Whether a plugin with this filter applies on `platform`.
    pub fn matches(&self, platform: Platform) -> bool {
        match self {
            PlatformFilter::Any => true,
            PlatformFilter::Unix => platform.is_unix(),
            PlatformFilter::Only(platforms) => platforms.contains(&platform),
        }
    }

    /// Human-readable form for plugin listings.
    pub fn describe(&self) -> String {
        match self {
            PlatformFilter::Any => "any".to_string(),
            PlatformFilter::Unix => "unix".to_string(),
            PlatformFilter::Only(platforms) => platforms
                .iter()
                .map(|p| p.identifier())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Hook for lazy scheduling: lets a context pull a not-yet-run provider
/// before a read resolves. The eager scheduler runs without one.
pub trait DemandResolver {
    /// Ensure the provider of `path`, if one is registered and has not yet
    /// run, has run to completion. Failures are recorded by the resolver;
    /// the subsequent read simply observes whatever the provider wrote.
    fn ensure_provider(&self, path: &AttributePath);
}

/// A named detection unit.
#[derive(Clone)]
pub struct Plugin {
    name: String,
    filter: PlatformFilter,
    provides: Vec<AttributePath>,
    depends: Vec<AttributePath>,
    body: PluginBody,
}

impl Plugin {
    /// Start building a plugin with the given unique name.
    pub fn builder(name: &str) -> PluginBuilder {
        PluginBuilder::new(name)
    }

    /// The plugin's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute paths this plugin writes under.
    pub fn provides(&self) -> &[AttributePath] {
        &self.provides
    }

    /// Attribute paths this plugin reads before writing.
    pub fn depends(&self) -> &[AttributePath] {
        &self.depends
    }

    /// The plugin's platform filter.
    pub fn filter(&self) -> &PlatformFilter {
        &self.filter
    }

    /// Whether this plugin applies on `platform`.
    pub fn applies_to(&self, platform: Platform) -> bool {
        self.filter.matches(platform)
    }

    /// Execute the run body.
    pub fn run(&self, ctx: &mut PluginContext<'_>) -> Result<()> {
        (self.body)(ctx)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("filter", &self.filter)
            .field("provides", &self.provides)
            .field("depends", &self.depends)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a [`Plugin`].
///
/// Validation happens in [`PluginBuilder::build`] so a malformed definition
/// surfaces as a recordable [`ReconError::InvalidPlugin`] instead of a
/// panic, and the registry can keep loading the remaining plugins.
pub struct PluginBuilder {
    name: String,
    filter: PlatformFilter,
    provides: Vec<String>,
    depends: Vec<String>,
    body: Option<PluginBody>,
}

impl PluginBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filter: PlatformFilter::Any,
            provides: Vec::new(),
            depends: Vec::new(),
            body: None,
        }
    }

    /// Declare an attribute path this plugin provides.
    pub fn provides(mut self, path: &str) -> Self {
        self.provides.push(path.to_string());
        self
    }

    /// Declare an attribute path this plugin depends on.
    pub fn depends(mut self, path: &str) -> Self {
        self.depends.push(path.to_string());
        self
    }

    /// Restrict the plugin to certain platforms.
    pub fn platforms(mut self, filter: PlatformFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the run body.
    pub fn body(
        mut self,
        body: impl Fn(&mut PluginContext<'_>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.body = Some(Arc::new(body));
        self
    }

    /// Validate and build the plugin.
    pub fn build(self) -> Result<Plugin> {
        let invalid = |message: &str| ReconError::InvalidPlugin {
            plugin: self.name.clone(),
            message: message.to_string(),
        };

        if self.name.is_empty() {
            return Err(ReconError::InvalidPlugin {
                plugin: "<unnamed>".to_string(),
                message: "plugin name must not be empty".to_string(),
            });
        }
        if self.provides.is_empty() {
            return Err(invalid("no provides declared"));
        }
        let body = match self.body {
            Some(body) => body,
            None => return Err(invalid("no run body declared")),
        };

        let parse_all = |raw: &[String], what: &str| -> Result<Vec<AttributePath>> {
            raw.iter()
                .map(|r| {
                    AttributePath::parse(r).map_err(|_| ReconError::InvalidPlugin {
                        plugin: self.name.clone(),
                        message: format!("invalid {} path '{}'", what, r),
                    })
                })
                .collect()
        };

        let provides = parse_all(&self.provides, "provides")?;
        let depends = parse_all(&self.depends, "depends")?;

        for dep in &depends {
            if provides.iter().any(|p| dep.overlaps(p)) {
                return Err(ReconError::InvalidPlugin {
                    plugin: self.name.clone(),
                    message: format!("depends on its own provided path '{}'", dep),
                });
            }
        }

        Ok(Plugin {
            name: self.name,
            filter: self.filter,
            provides,
            depends,
            body,
        })
    }
}

/// What a run body sees: tree reads, namespace-checked tree writes, and the
/// command runner, with the plugin's execution deadline threaded through to
/// every command invocation.
pub struct PluginContext<'a> {
    plugin: &'a Plugin,
    tree: &'a RwLock<AttributeTree>,
    runner: &'a dyn CommandRunner,
    deadline: Option<Instant>,
    resolver: Option<&'a dyn DemandResolver>,
}

impl<'a> PluginContext<'a> {
    /// Create a context for one plugin execution.
    pub fn new(
        plugin: &'a Plugin,
        tree: &'a RwLock<AttributeTree>,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            plugin,
            tree,
            runner,
            deadline: None,
            resolver: None,
        }
    }

    /// Attach an execution deadline (inherited by every command run).
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Attach a lazy-mode demand resolver.
    pub fn with_resolver(mut self, resolver: &'a dyn DemandResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The name of the plugin this context belongs to.
    pub fn plugin_name(&self) -> &str {
        self.plugin.name()
    }

    /// Read the value at `path`.
    ///
    /// Never fails: a missing path, like an unparseable one, reads as
    /// `None` — "not yet known or not applicable". Under lazy scheduling
    /// this is also the suspension point that pulls a not-yet-run provider.
    pub fn get(&self, path: &str) -> Option<AttributeValue> {
        let parsed = match AttributePath::parse(path) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "Plugin '{}' read invalid path '{}'",
                    self.plugin.name(),
                    path
                );
                return None;
            }
        };

        if let Some(resolver) = self.resolver {
            resolver.ensure_provider(&parsed);
        }

        let tree = match self.tree.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tree.get(&parsed).cloned()
    }

    /// Write `value` at `path`.
    ///
    /// The path must fall under one of the plugin's declared provides
    /// namespaces; anything else is a contract violation. Each write takes
    /// the tree's write lock, making it atomic with respect to concurrent
    /// readers and writers.
    pub fn set(&mut self, path: &str, value: impl Into<AttributeValue>) -> Result<()> {
        let parsed = AttributePath::parse(path)?;

        if !self.plugin.provides().iter().any(|p| parsed.starts_with(p)) {
            return Err(ReconError::ProvidesViolation {
                plugin: self.plugin.name().to_string(),
                path: path.to_string(),
            });
        }

        let mut tree = match self.tree.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tree.set(&parsed, value.into());
        Ok(())
    }

    /// Run an external command under the plugin's deadline.
    pub fn run(&self, command: &str) -> Result<CommandOutput> {
        self.runner.execute(command, self.deadline)
    }

    /// Whether a file exists.
    pub fn file_exists(&self, path: &Path) -> bool {
        self.runner.file_exists(path)
    }

    /// Read a file's lines.
    pub fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        self.runner.read_lines(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ScriptedRunner;

    fn probe_plugin() -> Plugin {
        Plugin::builder("probe")
            .provides("probe")
            .body(|_| Ok(()))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_constructs_plugin() {
        let plugin = Plugin::builder("lsb")
            .provides("lsb")
            .depends("platform.os")
            .platforms(PlatformFilter::Only(vec![Platform::Linux]))
            .body(|_| Ok(()))
            .build()
            .unwrap();

        assert_eq!(plugin.name(), "lsb");
        assert_eq!(plugin.provides().len(), 1);
        assert_eq!(plugin.depends().len(), 1);
        assert!(plugin.applies_to(Platform::Linux));
        assert!(!plugin.applies_to(Platform::Solaris));
    }

    #[test]
    fn builder_rejects_empty_name() {
        let result = Plugin::builder("").provides("x").body(|_| Ok(())).build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_missing_provides() {
        let result = Plugin::builder("p").body(|_| Ok(())).build();
        assert!(matches!(result, Err(ReconError::InvalidPlugin { .. })));
    }

    #[test]
    fn builder_rejects_missing_body() {
        let result = Plugin::builder("p").provides("x").build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_invalid_path() {
        let result = Plugin::builder("p")
            .provides("a..b")
            .body(|_| Ok(()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_self_dependency() {
        let result = Plugin::builder("p")
            .provides("lsb")
            .depends("lsb.id")
            .body(|_| Ok(()))
            .build();
        assert!(matches!(result, Err(ReconError::InvalidPlugin { .. })));
    }

    #[test]
    fn platform_filter_matches() {
        assert!(PlatformFilter::Any.matches(Platform::Windows));
        assert!(PlatformFilter::Unix.matches(Platform::Linux));
        assert!(!PlatformFilter::Unix.matches(Platform::Windows));
        assert!(PlatformFilter::Only(vec![Platform::Solaris]).matches(Platform::Solaris));
        assert!(!PlatformFilter::Only(vec![Platform::Solaris]).matches(Platform::Linux));
    }

    #[test]
    fn context_set_within_provides() {
        let plugin = probe_plugin();
        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new();

        let mut ctx = PluginContext::new(&plugin, &tree, &runner);
        ctx.set("probe.value", "found").unwrap();

        assert_eq!(
            ctx.get("probe.value").and_then(|v| v.as_str().map(String::from)),
            Some("found".to_string())
        );
    }

    #[test]
    fn context_set_outside_provides_is_violation() {
        let plugin = probe_plugin();
        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new();

        let mut ctx = PluginContext::new(&plugin, &tree, &runner);
        let err = ctx.set("kernel.name", "Linux").unwrap_err();
        assert!(matches!(err, ReconError::ProvidesViolation { .. }));

        // Nothing landed in the tree
        assert!(ctx.get("kernel.name").is_none());
    }

    #[test]
    fn context_get_missing_path_is_none() {
        let plugin = probe_plugin();
        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new();

        let ctx = PluginContext::new(&plugin, &tree, &runner);
        assert!(ctx.get("never.written").is_none());
    }

    #[test]
    fn context_get_invalid_path_is_none() {
        let plugin = probe_plugin();
        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new();

        let ctx = PluginContext::new(&plugin, &tree, &runner);
        assert!(ctx.get("a..b").is_none());
    }

    #[test]
    fn context_runs_commands_through_runner() {
        let plugin = probe_plugin();
        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new().with_command("uname -s", 0, &["Linux"]);

        let ctx = PluginContext::new(&plugin, &tree, &runner);
        let output = ctx.run("uname -s").unwrap();
        assert_eq!(output.stdout, vec!["Linux"]);

        assert!(ctx.run("missing-probe").unwrap_err().is_unavailable());
    }

    #[test]
    fn run_executes_body() {
        let plugin = Plugin::builder("writer")
            .provides("writer")
            .body(|ctx| ctx.set("writer.ran", true))
            .build()
            .unwrap();

        let tree = RwLock::new(AttributeTree::new());
        let runner = ScriptedRunner::new();
        let mut ctx = PluginContext::new(&plugin, &tree, &runner);

        plugin.run(&mut ctx).unwrap();
        assert_eq!(ctx.get("writer.ran").and_then(|v| v.as_bool()), Some(true));
    }
}
