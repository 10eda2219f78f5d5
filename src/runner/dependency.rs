//! Phase dependency graph.
//!
//! A phase depends on every phase in its `requires` list and, unless it is
//! marked `independent`, on the phase declared immediately before it.
//! Resolution produces maximal groups of phases whose dependencies are all
//! satisfied by earlier groups. Phases within a group may run concurrently.

use std::collections::{HashMap, HashSet};

use crate::error::{OrchestrateError, Result};
use crate::playbook::{Phase, Playbook};

/// Phases that may start together.
#[derive(Debug, Clone)]
pub struct PhaseGroup {
    /// Position of this group in execution order.
    pub index: usize,
    /// Phases in declaration order.
    pub phases: Vec<Phase>,
}

impl PhaseGroup {
    pub fn names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Dependency relationships between phases, in declaration order.
#[derive(Debug, Clone)]
pub struct PhaseGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    /// Direct dependencies, by node index.
    dependencies: Vec<Vec<usize>>,
    /// Reverse edges, by node index.
    dependents: Vec<Vec<usize>>,
}

impl PhaseGraph {
    /// Build the graph for a playbook.
    ///
    /// Fails with [`OrchestrateError::MissingDependency`] when a phase
    /// requires a phase that doesn't exist.
    pub fn from_playbook(playbook: &Playbook) -> Result<Self> {
        Self::from_edges(effective_edges(playbook))
    }

    /// Rebuild the graph from resolved groups, whose phases carry their
    /// effective dependencies.
    pub fn from_groups(groups: &[PhaseGroup]) -> Result<Self> {
        Self::from_edges(
            groups
                .iter()
                .flat_map(|g| &g.phases)
                .map(|phase| (phase.name.clone(), phase.requires.clone()))
                .collect(),
        )
    }

    /// Build from explicit `(phase, dependencies)` pairs in declaration order.
    pub fn from_edges(edges: Vec<(String, Vec<String>)>) -> Result<Self> {
        let names: Vec<String> = edges.iter().map(|(name, _)| name.clone()).collect();
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut dependencies = vec![Vec::new(); names.len()];
        let mut dependents = vec![Vec::new(); names.len()];

        for (node, (name, deps)) in edges.iter().enumerate() {
            for dep in deps {
                let Some(&target) = index.get(dep) else {
                    return Err(OrchestrateError::MissingDependency {
                        phase: name.clone(),
                        missing: dep.clone(),
                    });
                };
                if !dependencies[node].contains(&target) {
                    dependencies[node].push(target);
                    dependents[target].push(node);
                }
            }
        }

        Ok(Self {
            names,
            index,
            dependencies,
            dependents,
        })
    }

    /// Find a cycle, returning its path (`[a, b, a]`) if one exists.
    ///
    /// Nodes and edges are walked in declaration order, so the reported
    /// cycle is the same on every run.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Unvisited,
            Visiting,
            Visited,
        }

        fn dfs(
            node: usize,
            graph: &PhaseGraph,
            state: &mut [State],
            path: &mut Vec<usize>,
        ) -> Option<Vec<String>> {
            state[node] = State::Visiting;
            path.push(node);

            for &dep in &graph.dependencies[node] {
                match state[dep] {
                    State::Visiting => {
                        let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = path[start..]
                            .iter()
                            .map(|&n| graph.names[n].clone())
                            .collect();
                        cycle.push(graph.names[dep].clone());
                        return Some(cycle);
                    }
                    State::Unvisited => {
                        if let Some(cycle) = dfs(dep, graph, state, path) {
                            return Some(cycle);
                        }
                    }
                    State::Visited => {}
                }
            }

            path.pop();
            state[node] = State::Visited;
            None
        }

        let mut state = vec![State::Unvisited; self.names.len()];
        let mut path = Vec::new();

        for node in 0..self.names.len() {
            if state[node] == State::Unvisited {
                if let Some(cycle) = dfs(node, self, &mut state, &mut path) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn cycle_error(&self) -> Option<OrchestrateError> {
        self.find_cycle()
            .map(|cycle| OrchestrateError::CyclicDependency {
                cycle: cycle.join(" -> "),
            })
    }

    /// Maximal groups of phase indices; each group's dependencies are
    /// satisfied by earlier groups.
    pub fn levels(&self) -> Result<Vec<Vec<usize>>> {
        if let Some(err) = self.cycle_error() {
            return Err(err);
        }

        let mut levels = Vec::new();
        let mut completed = vec![false; self.names.len()];
        let mut remaining = self.names.len();

        while remaining > 0 {
            let ready: Vec<usize> = (0..self.names.len())
                .filter(|&n| !completed[n])
                .filter(|&n| self.dependencies[n].iter().all(|&d| completed[d]))
                .collect();

            if ready.is_empty() {
                break;
            }

            for &n in &ready {
                completed[n] = true;
            }
            remaining -= ready.len();
            levels.push(ready);
        }

        Ok(levels)
    }

    /// Phases depending on `phase`, directly or indirectly, in graph order.
    pub fn transitive_dependents(&self, phase: &str) -> Vec<String> {
        let Some(&start) = self.index.get(phase) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut to_visit = vec![start];
        while let Some(current) = to_visit.pop() {
            for &dep in &self.dependents[current] {
                if seen.insert(dep) {
                    to_visit.push(dep);
                }
            }
        }

        let mut result: Vec<usize> = seen.into_iter().collect();
        result.sort_unstable();
        result.into_iter().map(|n| self.names[n].clone()).collect()
    }
}

/// `(phase, dependencies)` pairs: declared `requires` plus the previous
/// phase unless the phase is independent.
fn effective_edges(playbook: &Playbook) -> Vec<(String, Vec<String>)> {
    playbook
        .phases
        .iter()
        .enumerate()
        .map(|(i, phase)| {
            let mut deps = phase.requires.clone();
            if i > 0 && !phase.independent {
                let previous = playbook.phases[i - 1].name.clone();
                if !deps.contains(&previous) {
                    deps.push(previous);
                }
            }
            (phase.name.clone(), deps)
        })
        .collect()
}

/// Resolve a playbook into ordered phase groups.
///
/// Each resolved phase's `requires` holds its effective dependencies,
/// including the implicit previous phase.
pub fn resolve(playbook: &Playbook) -> Result<Vec<PhaseGroup>> {
    let edges = effective_edges(playbook);
    let graph = PhaseGraph::from_edges(edges.clone())?;
    let levels = graph.levels()?;

    Ok(levels
        .into_iter()
        .enumerate()
        .map(|(index, nodes)| PhaseGroup {
            index,
            phases: nodes
                .into_iter()
                .map(|n| Phase {
                    requires: edges[n].1.clone(),
                    ..playbook.phases[n].clone()
                })
                .collect(),
        })
        .collect())
}
