//! One collection run, end to end.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::plugin::{Plugin, PluginRegistry};
use crate::shell::{detect_platform, CommandRunner, Platform};
use crate::tree::{AttributePath, AttributeTree, AttributeValue};

use super::scheduler::{self, Deadlines, PluginFailure, ScheduleMode};

/// Engine options for one collection run.
///
/// Always an explicit object handed to the [`Collector`] — configuration is
/// never read from globals, and nothing outlives the run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrently executing plugins (eager mode).
    pub workers: usize,
    /// Per-plugin execution deadline.
    pub plugin_timeout: Option<Duration>,
    /// Whole-run deadline; when it passes, in-flight commands are killed
    /// and plugins not yet started are skipped.
    pub run_timeout: Option<Duration>,
    /// Scheduling model.
    pub mode: ScheduleMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            plugin_timeout: None,
            run_timeout: None,
            mode: ScheduleMode::Eager,
        }
    }
}

/// Overall status of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every applicable plugin ran to completion.
    Complete,
    /// Some plugins failed, timed out, or were skipped; the tree holds
    /// everything that did complete.
    Partial,
    /// A dependency cycle made a full safe order impossible. Plugins
    /// outside the cycle still ran and their attributes are kept.
    Failed,
}

/// Result of one collection run: the final tree plus what happened.
#[derive(Debug, Serialize)]
pub struct CollectionReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
    /// Platform the run executed on.
    pub platform: Platform,
    /// Overall status.
    pub status: RunStatus,
    /// The finished attribute tree snapshot.
    pub tree: AttributeValue,
    /// Contained per-plugin failures, sorted by plugin name.
    pub failures: Vec<PluginFailure>,
    /// Plugins on a dependency cycle, sorted by name.
    pub cycle: Vec<String>,
    /// Plugins skipped because the run deadline passed, sorted by name.
    pub skipped: Vec<String>,
}

impl CollectionReport {
    /// Whether the run produced everything it could.
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }
}

/// Orchestrates one full collection pass: discovery, scheduling, execution,
/// final snapshot. Owns its registry for exactly one run — registries are
/// built fresh per run so stale dependency indexes cannot occur.
pub struct Collector<'a> {
    registry: PluginRegistry,
    runner: &'a dyn CommandRunner,
    platform: Platform,
    config: EngineConfig,
}

impl<'a> Collector<'a> {
    /// Create a collector for the detected host platform with default
    /// engine options.
    pub fn new(registry: PluginRegistry, runner: &'a dyn CommandRunner) -> Self {
        Self {
            registry,
            runner,
            platform: detect_platform(),
            config: EngineConfig::default(),
        }
    }

    /// Override the platform (tests and cross-inspection).
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Override the engine options.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry this collector will draw from.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Execute one collection run.
    pub fn run(&self) -> CollectionReport {
        let started_at = Utc::now();
        let start = Instant::now();

        let tree = RwLock::new(AttributeTree::new());
        self.seed(&tree);

        let selected: Vec<Plugin> = self
            .registry
            .discover(self.platform)
            .into_iter()
            .cloned()
            .collect();
        debug!(
            "Discovered {} plugins for platform '{}'",
            selected.len(),
            self.platform.identifier()
        );

        let deadlines = Deadlines {
            plugin_timeout: self.config.plugin_timeout,
            run_deadline: self.config.run_timeout.map(|t| start + t),
        };

        let mut outcome = match self.config.mode {
            ScheduleMode::Eager => scheduler::run_eager(
                &selected,
                &self.registry,
                &tree,
                self.runner,
                self.config.workers,
                deadlines,
            ),
            ScheduleMode::Lazy => {
                scheduler::run_lazy(&selected, &self.registry, &tree, self.runner, deadlines)
            }
        };

        outcome.failures.sort_by(|a, b| a.plugin.cmp(&b.plugin));

        let status = if !outcome.cycle.is_empty() {
            RunStatus::Failed
        } else if !outcome.failures.is_empty() || outcome.cancelled {
            RunStatus::Partial
        } else {
            RunStatus::Complete
        };

        let snapshot = match tree.read() {
            Ok(guard) => guard.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        };

        CollectionReport {
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            platform: self.platform,
            status,
            tree: snapshot,
            failures: outcome.failures,
            cycle: outcome.cycle,
            skipped: outcome.skipped,
        }
    }

    /// Pre-seed platform identification so every plugin can read the OS
    /// family without depending on another plugin.
    fn seed(&self, tree: &RwLock<AttributeTree>) {
        let mut tree = match tree.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Ok(path) = AttributePath::parse("platform.os") {
            tree.set(&path, self.platform.identifier().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;
    use crate::shell::ScriptedRunner;

    fn simple_registry() -> PluginRegistry {
        let mut registry = PluginRegistry::new();
        registry.load(
            Plugin::builder("greeter")
                .provides("greeter")
                .body(|ctx| ctx.set("greeter.hello", "world"))
                .build(),
        );
        registry
    }

    #[test]
    fn run_seeds_platform_os() {
        let runner = ScriptedRunner::new();
        let report = Collector::new(simple_registry(), &runner)
            .with_platform(Platform::Linux)
            .run();

        assert_eq!(
            report
                .tree
                .get("platform")
                .and_then(|p| p.get("os"))
                .and_then(|v| v.as_str()),
            Some("linux")
        );
    }

    #[test]
    fn successful_run_is_complete() {
        let runner = ScriptedRunner::new();
        let report = Collector::new(simple_registry(), &runner)
            .with_platform(Platform::Linux)
            .run();

        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.is_complete());
        assert!(report.failures.is_empty());
        assert_eq!(
            report
                .tree
                .get("greeter")
                .and_then(|g| g.get("hello"))
                .and_then(|v| v.as_str()),
            Some("world")
        );
    }

    #[test]
    fn plugin_failure_makes_run_partial() {
        let mut registry = simple_registry();
        registry.load(
            Plugin::builder("faulty")
                .provides("faulty")
                .body(|ctx| {
                    Err(ReconError::PluginFailed {
                        plugin: ctx.plugin_name().to_string(),
                        message: "unexpected".to_string(),
                    })
                })
                .build(),
        );

        let runner = ScriptedRunner::new();
        let report = Collector::new(registry, &runner)
            .with_platform(Platform::Linux)
            .run();

        assert_eq!(report.status, RunStatus::Partial);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].plugin, "faulty");
        // the healthy plugin still populated its namespace
        assert!(report.tree.get("greeter").is_some());
    }

    #[test]
    fn cycle_makes_run_failed_but_keeps_tree() {
        let mut registry = PluginRegistry::new();
        registry.load(
            Plugin::builder("a")
                .provides("a")
                .depends("b.value")
                .body(|ctx| ctx.set("a.value", 1))
                .build(),
        );
        registry.load(
            Plugin::builder("b")
                .provides("b")
                .depends("a.value")
                .body(|ctx| ctx.set("b.value", 2))
                .build(),
        );
        registry.load(
            Plugin::builder("c")
                .provides("c")
                .body(|ctx| ctx.set("c.value", 3))
                .build(),
        );

        let runner = ScriptedRunner::new();
        let report = Collector::new(registry, &runner)
            .with_platform(Platform::Linux)
            .run();

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.cycle, vec!["a", "b"]);
        assert!(report.tree.get("c").is_some());
        assert!(report.tree.get("a").is_none());
    }

    #[test]
    fn wrong_platform_plugins_never_run() {
        let mut registry = PluginRegistry::new();
        registry.load(
            Plugin::builder("solaris-only")
                .provides("smbios")
                .platforms(crate::plugin::PlatformFilter::Only(vec![Platform::Solaris]))
                .body(|ctx| ctx.set("smbios.ran", true))
                .build(),
        );

        let runner = ScriptedRunner::new();
        let report = Collector::new(registry, &runner)
            .with_platform(Platform::Linux)
            .run();

        assert_eq!(report.status, RunStatus::Complete);
        assert!(report.tree.get("smbios").is_none());
    }

    #[test]
    fn expired_run_timeout_reports_partial_with_seed_only() {
        let runner = ScriptedRunner::new();
        let config = EngineConfig {
            run_timeout: Some(Duration::ZERO),
            ..EngineConfig::default()
        };
        let report = Collector::new(simple_registry(), &runner)
            .with_platform(Platform::Linux)
            .with_config(config)
            .run();

        assert_eq!(report.status, RunStatus::Partial);
        assert_eq!(report.skipped, vec!["greeter"]);
        assert!(report.tree.get("platform").is_some());
        assert!(report.tree.get("greeter").is_none());
    }

    #[test]
    fn report_serializes_to_json() {
        let runner = ScriptedRunner::new();
        let report = Collector::new(simple_registry(), &runner)
            .with_platform(Platform::Linux)
            .run();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"complete\""));
        assert!(json.contains("\"platform\":\"linux\""));
    }
}
