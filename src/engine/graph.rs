//! Dependency graph for plugin execution ordering.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::plugin::{Plugin, PluginRegistry};

/// The dependency relationships between plugins in one collection run.
///
/// An edge from plugin P to plugin Q exists when P declares a dependency on
/// an attribute path Q provides. The graph is derived fresh per run from the
/// registry's provider index — it is never stored across runs.
///
/// A declared dependency whose path no registered plugin provides creates no
/// edge at all: the path simply resolves to "absent" and the dependent still
/// runs (readers are written defensively against missing paths).
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Map of plugin name to the plugins it depends on.
    dependencies: HashMap<String, HashSet<String>>,
    /// Map of plugin name to the plugins that depend on it.
    dependents: HashMap<String, HashSet<String>>,
    /// All plugin names in the graph.
    nodes: BTreeSet<String>,
}

/// A graph resolved into an executable shape: groups of plugins that may run
/// concurrently, in dependency order, plus the plugins trapped in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Parallel groups: every plugin's dependencies are satisfied by
    /// earlier groups. Deterministically ordered within each group.
    pub groups: Vec<Vec<String>>,
    /// Plugins on a dependency cycle, sorted by name. These never run;
    /// their dependents (if not themselves cyclic) still do, observing
    /// the cycle members' attributes as absent.
    pub cycle: Vec<String>,
}

impl DependencyGraph {
    /// Derive the graph for a selected set of plugins.
    ///
    /// Edges are added only between plugins in `selected`; a provider that
    /// exists in the registry but was not discovered for this platform is
    /// treated the same as a missing provider.
    pub fn build(selected: &[Plugin], registry: &PluginRegistry) -> Self {
        let nodes: BTreeSet<String> = selected.iter().map(|p| p.name().to_string()).collect();

        let mut dependencies: HashMap<String, HashSet<String>> = HashMap::new();
        let mut dependents: HashMap<String, HashSet<String>> = HashMap::new();
        for name in &nodes {
            dependencies.insert(name.clone(), HashSet::new());
            dependents.insert(name.clone(), HashSet::new());
        }

        for plugin in selected {
            for dep in plugin.depends() {
                let Some(provider) = registry.provider_of(dep) else {
                    continue;
                };
                if provider.name() == plugin.name() || !nodes.contains(provider.name()) {
                    continue;
                }
                if let Some(deps) = dependencies.get_mut(plugin.name()) {
                    deps.insert(provider.name().to_string());
                }
                if let Some(deps) = dependents.get_mut(provider.name()) {
                    deps.insert(plugin.name().to_string());
                }
            }
        }

        Self {
            dependencies,
            dependents,
            nodes,
        }
    }

    /// Get the direct dependencies of a plugin.
    pub fn dependencies_of(&self, plugin: &str) -> Option<&HashSet<String>> {
        self.dependencies.get(plugin)
    }

    /// Get plugins that depend on the given plugin.
    pub fn dependents_of(&self, plugin: &str) -> Option<&HashSet<String>> {
        self.dependents.get(plugin)
    }

    /// Check if a plugin exists in the graph.
    pub fn contains(&self, plugin: &str) -> bool {
        self.nodes.contains(plugin)
    }

    /// Get the number of plugins in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a plugin is ready to run given completed plugins.
    pub fn is_ready(&self, plugin: &str, completed: &BTreeSet<String>) -> bool {
        match self.dependencies.get(plugin) {
            None => true,
            Some(deps) => deps.iter().all(|d| completed.contains(d)),
        }
    }

    /// Plugins that sit on a dependency cycle.
    ///
    /// Kahn-trims the acyclic part away, then keeps only the leftover nodes
    /// that can reach themselves — a leftover node that merely depends on a
    /// cycle is downstream of it, not part of it.
    pub fn cycle_members(&self) -> BTreeSet<String> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for node in &self.nodes {
            in_degree.insert(
                node.as_str(),
                self.dependencies.get(node).map_or(0, |d| d.len()),
            );
        }

        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(node, _)| *node)
            .collect();

        let mut trimmed: HashSet<&str> = HashSet::new();
        while let Some(node) = queue.pop() {
            trimmed.insert(node);
            if let Some(dependents) = self.dependents.get(node) {
                for dependent in dependents {
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push(dependent);
                        }
                    }
                }
            }
        }

        let leftover: HashSet<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !trimmed.contains(n))
            .collect();

        leftover
            .iter()
            .filter(|&&node| self.reaches_within(node, node, &leftover))
            .map(|&node| node.to_string())
            .collect()
    }

    /// Whether `target` is reachable from `from` by following dependency
    /// edges, staying within `allowed` nodes.
    fn reaches_within(&self, from: &str, target: &str, allowed: &HashSet<&str>) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut to_visit: Vec<&str> = vec![from];

        while let Some(current) = to_visit.pop() {
            let Some(deps) = self.dependencies.get(current) else {
                continue;
            };
            for dep in deps {
                if dep == target {
                    return true;
                }
                if allowed.contains(dep.as_str()) && visited.insert(dep) {
                    to_visit.push(dep);
                }
            }
        }

        false
    }

    /// Find a cycle in the graph, returning the path if one exists.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        let mut state: HashMap<&str, State> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), State::Unvisited))
            .collect();

        let mut path: Vec<String> = Vec::new();

        fn dfs<'a>(
            node: &'a str,
            graph: &'a DependencyGraph,
            state: &mut HashMap<&'a str, State>,
            path: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            state.insert(node, State::Visiting);
            path.push(node.to_string());

            if let Some(deps) = graph.dependencies.get(node) {
                for dep in deps {
                    match state.get(dep.as_str()) {
                        Some(State::Visiting) => {
                            let cycle_start =
                                path.iter().position(|n| n == dep).unwrap_or(0);
                            let mut cycle: Vec<String> = path[cycle_start..].to_vec();
                            cycle.push(dep.clone());
                            return Some(cycle);
                        }
                        Some(State::Unvisited) | None => {
                            if let Some(cycle) = dfs(dep, graph, state, path) {
                                return Some(cycle);
                            }
                        }
                        Some(State::Visited) => {}
                    }
                }
            }

            path.pop();
            state.insert(node, State::Visited);
            None
        }

        for node in &self.nodes {
            if state.get(node.as_str()) == Some(&State::Unvisited) {
                if let Some(cycle) = dfs(node, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Resolve the graph into parallel execution groups.
    ///
    /// Cycle members are excluded from the groups; dependencies on them are
    /// considered settled (their attributes will be absent), so plugins
    /// downstream of a cycle still get scheduled.
    pub fn schedule(&self) -> Schedule {
        let cycle = self.cycle_members();

        let mut groups: Vec<Vec<String>> = Vec::new();
        let mut completed: BTreeSet<String> = cycle.clone();

        while completed.len() < self.nodes.len() {
            let ready: Vec<String> = self
                .nodes
                .iter()
                .filter(|n| !completed.contains(*n))
                .filter(|n| self.is_ready(n, &completed))
                .cloned()
                .collect();

            if ready.is_empty() {
                break;
            }

            completed.extend(ready.iter().cloned());
            groups.push(ready);
        }

        Schedule {
            groups,
            cycle: cycle.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;

    /// Registry + selected set where each plugin provides a namespace
    /// matching its own name and depends on the listed namespaces.
    fn fixture(specs: &[(&str, &[&str])]) -> (Vec<Plugin>, PluginRegistry) {
        let mut registry = PluginRegistry::new();
        for (name, deps) in specs {
            let mut builder = Plugin::builder(name).provides(name).body(|_| Ok(()));
            for dep in *deps {
                builder = builder.depends(dep);
            }
            registry.load(builder.build());
        }
        let selected: Vec<Plugin> = specs
            .iter()
            .filter_map(|(name, _)| registry.get(name).cloned())
            .collect();
        (selected, registry)
    }

    fn graph(specs: &[(&str, &[&str])]) -> DependencyGraph {
        let (selected, registry) = fixture(specs);
        DependencyGraph::build(&selected, &registry)
    }

    #[test]
    fn empty_graph() {
        let g = graph(&[]);
        assert!(g.is_empty());
        assert_eq!(g.schedule().groups.len(), 0);
    }

    #[test]
    fn build_links_provider_to_dependent() {
        let g = graph(&[("lsb", &[]), ("platform", &["lsb.id"])]);

        assert!(g.dependencies_of("platform").unwrap().contains("lsb"));
        assert!(g.dependents_of("lsb").unwrap().contains("platform"));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn missing_provider_creates_no_edge() {
        let g = graph(&[("platform", &["nosuch.attr"])]);
        assert!(g.dependencies_of("platform").unwrap().is_empty());
    }

    #[test]
    fn schedule_linear_chain_orders_dependencies_first() {
        let g = graph(&[
            ("third", &["second"]),
            ("second", &["first"]),
            ("first", &[]),
        ]);

        let schedule = g.schedule();
        assert!(schedule.cycle.is_empty());
        assert_eq!(
            schedule.groups,
            vec![vec!["first"], vec!["second"], vec!["third"]]
        );
    }

    #[test]
    fn schedule_diamond_groups_independent_plugins() {
        let g = graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]);

        let schedule = g.schedule();
        assert_eq!(schedule.groups.len(), 3);
        assert_eq!(schedule.groups[0], vec!["a"]);
        assert_eq!(schedule.groups[1], vec!["b", "c"]);
        assert_eq!(schedule.groups[2], vec!["d"]);
    }

    #[test]
    fn schedule_independent_plugins_share_one_group() {
        let g = graph(&[("a", &[]), ("b", &[]), ("c", &[])]);
        let schedule = g.schedule();
        assert_eq!(schedule.groups.len(), 1);
        assert_eq!(schedule.groups[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn schedule_is_deterministic() {
        let g = graph(&[("zeta", &[]), ("alpha", &[]), ("mid", &["zeta"])]);
        let first = g.schedule();
        let second = g.schedule();
        assert_eq!(first, second);
        // sorted within groups
        assert_eq!(first.groups[0], vec!["alpha", "zeta"]);
    }

    #[test]
    fn cycle_members_detects_two_cycle() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);

        let members = g.cycle_members();
        assert!(members.contains("a"));
        assert!(members.contains("b"));
        assert!(!members.contains("c"));
    }

    #[test]
    fn downstream_of_cycle_is_not_a_member_and_still_scheduled() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("d", &["a"])]);

        let schedule = g.schedule();
        assert_eq!(schedule.cycle, vec!["a", "b"]);
        // d still runs, with a's attributes absent
        assert_eq!(schedule.groups, vec![vec!["d"]]);
    }

    #[test]
    fn no_cycle_returns_none() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        assert!(g.find_cycle().is_none());
        assert!(g.cycle_members().is_empty());
    }

    #[test]
    fn find_cycle_returns_closed_path() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);

        let path = g.find_cycle().unwrap();
        assert!(path.len() >= 3);
        assert_eq!(path.first(), path.last());
    }

    #[test]
    fn longer_cycle_includes_all_members() {
        let g = graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);

        let members = g.cycle_members();
        assert_eq!(members.len(), 3);
        assert!(g.schedule().groups.is_empty());
    }

    #[test]
    fn is_ready_respects_completed_set() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);

        let mut completed = BTreeSet::new();
        assert!(g.is_ready("a", &completed));
        assert!(!g.is_ready("b", &completed));

        completed.insert("a".to_string());
        assert!(g.is_ready("b", &completed));
    }

    #[test]
    fn dependency_on_unselected_provider_is_dropped() {
        // platform depends on lsb, but lsb was not discovered (selected)
        let mut registry = PluginRegistry::new();
        registry.load(Plugin::builder("lsb").provides("lsb").body(|_| Ok(())).build());
        registry.load(
            Plugin::builder("platform")
                .provides("platform.name")
                .depends("lsb.id")
                .body(|_| Ok(()))
                .build(),
        );

        let selected = vec![registry.get("platform").cloned().unwrap()];
        let g = DependencyGraph::build(&selected, &registry);

        assert!(g.dependencies_of("platform").unwrap().is_empty());
        assert_eq!(g.schedule().groups, vec![vec!["platform"]]);
    }
}
