//! Execution drivers for the two scheduling models.
//!
//! **Eager** resolves the full topological order up front and executes it
//! in parallel groups on a bounded worker pool. **Lazy** runs plugins
//! one at a time in discovery order, pulling each plugin's providers
//! immediately before its body starts (and on demand when a body reads a
//! path whose provider has not run yet).
//!
//! Both drivers enforce the same contracts: each plugin executes at most
//! once per run, failures are contained at the plugin boundary, cycle
//! members never run, and for a given fixture the two models produce
//! identical final trees.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ReconError;
use crate::plugin::{DemandResolver, Plugin, PluginContext, PluginRegistry};
use crate::shell::CommandRunner;
use crate::tree::{AttributePath, AttributeTree};

use super::graph::DependencyGraph;

/// Which scheduling model drives execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Full topological order up front, parallel groups, worker pool.
    #[default]
    Eager,
    /// Single-threaded, demand-driven: providers run when first needed.
    Lazy,
}

/// Why a plugin failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Unexpected error inside the plugin body.
    Runtime,
    /// The plugin's deadline passed while a command was running.
    Timeout,
    /// The plugin sits on a dependency cycle and was never run.
    Cycle,
}

/// One contained plugin failure.
#[derive(Debug, Clone, Serialize)]
pub struct PluginFailure {
    /// Plugin name.
    pub plugin: String,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub message: String,
}

/// What a scheduling pass reports back to the collection run.
#[derive(Debug, Default)]
pub(crate) struct SchedulerOutcome {
    pub failures: Vec<PluginFailure>,
    pub cycle: Vec<String>,
    pub skipped: Vec<String>,
    pub cancelled: bool,
}

/// Per-run limits shared by both drivers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadlines {
    pub plugin_timeout: Option<Duration>,
    pub run_deadline: Option<Instant>,
}

impl Deadlines {
    /// The deadline for a plugin starting now: the sooner of its own
    /// timeout and the whole run's deadline.
    fn plugin_deadline(&self) -> Option<Instant> {
        let from_timeout = self.plugin_timeout.map(|t| Instant::now() + t);
        match (from_timeout, self.run_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether the whole run is out of time.
    fn run_expired(&self) -> bool {
        self.run_deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Run one plugin body with failure containment.
///
/// Returns `None` on success and on the benign unavailable case; a
/// `Some(PluginFailure)` otherwise. A panic inside the body is contained
/// the same way an `Err` is — one plugin must never take down the run.
fn execute_plugin(
    plugin: &Plugin,
    tree: &RwLock<AttributeTree>,
    runner: &dyn CommandRunner,
    deadline: Option<Instant>,
    resolver: Option<&dyn DemandResolver>,
) -> Option<PluginFailure> {
    debug!("Running plugin '{}'", plugin.name());

    let mut ctx = PluginContext::new(plugin, tree, runner).with_deadline(deadline);
    if let Some(resolver) = resolver {
        ctx = ctx.with_resolver(resolver);
    }

    let result = catch_unwind(AssertUnwindSafe(|| plugin.run(&mut ctx)));

    match result {
        Ok(Ok(())) => None,
        Ok(Err(err)) if err.is_unavailable() => {
            debug!(
                "Plugin '{}' does not apply here: {}",
                plugin.name(),
                err
            );
            None
        }
        Ok(Err(ReconError::CommandTimedOut { command })) => {
            warn!("Plugin '{}' timed out running '{}'", plugin.name(), command);
            Some(PluginFailure {
                plugin: plugin.name().to_string(),
                kind: FailureKind::Timeout,
                message: format!("command timed out: {}", command),
            })
        }
        Ok(Err(err)) => {
            warn!("Plugin '{}' failed: {}", plugin.name(), err);
            Some(PluginFailure {
                plugin: plugin.name().to_string(),
                kind: FailureKind::Runtime,
                message: err.to_string(),
            })
        }
        Err(_) => {
            warn!("Plugin '{}' panicked", plugin.name());
            Some(PluginFailure {
                plugin: plugin.name().to_string(),
                kind: FailureKind::Runtime,
                message: "plugin body panicked".to_string(),
            })
        }
    }
}

fn cycle_failure(name: &str, path: &str) -> PluginFailure {
    PluginFailure {
        plugin: name.to_string(),
        kind: FailureKind::Cycle,
        message: format!("member of dependency cycle: {}", path),
    }
}

/// Drive a run in eager mode.
pub(crate) fn run_eager(
    selected: &[Plugin],
    registry: &PluginRegistry,
    tree: &RwLock<AttributeTree>,
    runner: &dyn CommandRunner,
    workers: usize,
    deadlines: Deadlines,
) -> SchedulerOutcome {
    let graph = DependencyGraph::build(selected, registry);
    let schedule = graph.schedule();

    let mut outcome = SchedulerOutcome {
        cycle: schedule.cycle.clone(),
        ..SchedulerOutcome::default()
    };

    if !schedule.cycle.is_empty() {
        let path = graph
            .find_cycle()
            .map(|p| p.join(" -> "))
            .unwrap_or_else(|| schedule.cycle.join(" -> "));
        warn!("Dependency cycle detected: {}", path);
        for member in &schedule.cycle {
            outcome.failures.push(cycle_failure(member, &path));
        }
    }

    let by_name: HashMap<&str, &Plugin> =
        selected.iter().map(|p| (p.name(), p)).collect();

    let failures: Mutex<Vec<PluginFailure>> = Mutex::new(Vec::new());
    let skipped: Mutex<Vec<String>> = Mutex::new(Vec::new());

    for group in &schedule.groups {
        let queue: Mutex<VecDeque<&Plugin>> = Mutex::new(
            group
                .iter()
                .filter_map(|name| by_name.get(name.as_str()).copied())
                .collect(),
        );

        let worker_count = workers.clamp(1, group.len().max(1));

        thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| loop {
                    let plugin = {
                        let mut queue = lock(&queue);
                        queue.pop_front()
                    };
                    let Some(plugin) = plugin else {
                        break;
                    };

                    if deadlines.run_expired() {
                        lock(&skipped).push(plugin.name().to_string());
                        continue;
                    }

                    if let Some(failure) = execute_plugin(
                        plugin,
                        tree,
                        runner,
                        deadlines.plugin_deadline(),
                        None,
                    ) {
                        lock(&failures).push(failure);
                    }
                });
            }
        });
    }

    outcome.failures.extend(lock(&failures).drain(..));
    let mut skipped_names: Vec<String> = lock(&skipped).drain(..).collect();
    skipped_names.sort();
    outcome.cancelled = !skipped_names.is_empty();
    outcome.skipped = skipped_names;
    outcome
}

/// Lock a mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Drive a run in lazy mode.
pub(crate) fn run_lazy(
    selected: &[Plugin],
    registry: &PluginRegistry,
    tree: &RwLock<AttributeTree>,
    runner: &dyn CommandRunner,
    deadlines: Deadlines,
) -> SchedulerOutcome {
    let driver = LazyDriver {
        by_name: selected.iter().map(|p| (p.name(), p)).collect(),
        registry,
        tree,
        runner,
        deadlines,
        state: RefCell::new(LazyState::default()),
    };

    for plugin in selected {
        let _ = driver.run_plugin(plugin.name());
    }

    let state = driver.state.into_inner();
    let mut skipped = state.skipped;
    skipped.sort();
    SchedulerOutcome {
        failures: state.failures,
        cycle: state.cycle.into_iter().collect(),
        cancelled: !skipped.is_empty(),
        skipped,
    }
}

#[derive(Default)]
struct LazyState {
    done: HashSet<String>,
    stack: Vec<String>,
    failures: Vec<PluginFailure>,
    cycle: BTreeSet<String>,
    skipped: Vec<String>,
}

/// How a lazy `run_plugin` call resolved.
enum Visit {
    /// The plugin has run (now or earlier), or was skipped; its
    /// attributes are settled either way.
    Settled,
    /// The request hit a dependency cycle; the named plugins are its
    /// members. Callers outside the member set carry on — the dependency
    /// just reads as absent.
    CycleHit(Vec<String>),
}

struct LazyDriver<'a> {
    by_name: HashMap<&'a str, &'a Plugin>,
    registry: &'a PluginRegistry,
    tree: &'a RwLock<AttributeTree>,
    runner: &'a dyn CommandRunner,
    deadlines: Deadlines,
    state: RefCell<LazyState>,
}

impl LazyDriver<'_> {
    /// Run `name` to completion unless it already ran (memoized by name)
    /// or turns out to sit on a cycle.
    fn run_plugin(&self, name: &str) -> Visit {
        {
            let state = self.state.borrow();
            if state.done.contains(name) {
                return Visit::Settled;
            }
            if let Some(pos) = state.stack.iter().position(|n| n == name) {
                let members: Vec<String> = state.stack[pos..].to_vec();
                drop(state);
                let mut state = self.state.borrow_mut();
                for member in &members {
                    state.cycle.insert(member.clone());
                }
                return Visit::CycleHit(members);
            }
        }

        let Some(&plugin) = self.by_name.get(name) else {
            return Visit::Settled;
        };

        if self.deadlines.run_expired() {
            let mut state = self.state.borrow_mut();
            state.done.insert(name.to_string());
            state.skipped.push(name.to_string());
            return Visit::Settled;
        }

        self.state.borrow_mut().stack.push(name.to_string());

        // Resolve declared dependencies before the body starts, so cycle
        // detection fires before any partial writes (matching eager mode,
        // where cycle members are excluded from the schedule entirely).
        let mut cycle_hit: Option<Vec<String>> = None;
        for dep in plugin.depends() {
            if let Visit::CycleHit(members) = self.ensure(dep) {
                if members.iter().any(|m| m == name) {
                    cycle_hit = Some(members);
                    break;
                }
            }
        }

        if let Some(members) = cycle_hit {
            let path = format!("{} -> {}", members.join(" -> "), members[0]);
            warn!("Dependency cycle detected: {}", path);
            let mut state = self.state.borrow_mut();
            state.stack.pop();
            state.done.insert(name.to_string());
            state.failures.push(cycle_failure(name, &path));
            return Visit::CycleHit(members);
        }

        let failure = execute_plugin(
            plugin,
            self.tree,
            self.runner,
            self.deadlines.plugin_deadline(),
            Some(self),
        );

        let mut state = self.state.borrow_mut();
        state.stack.pop();
        state.done.insert(name.to_string());
        if let Some(failure) = failure {
            state.failures.push(failure);
        }
        Visit::Settled
    }

    /// Run the provider of `path`, if one was discovered and has not run.
    fn ensure(&self, path: &AttributePath) -> Visit {
        let Some(provider) = self.registry.provider_of(path) else {
            return Visit::Settled;
        };
        if !self.by_name.contains_key(provider.name()) {
            return Visit::Settled;
        }
        self.run_plugin(provider.name())
    }
}

impl DemandResolver for LazyDriver<'_> {
    fn ensure_provider(&self, path: &AttributePath) {
        let _ = self.ensure(path);
    }
}
