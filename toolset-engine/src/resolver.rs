//! Dependency closure and activation ordering.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use toolset_primitives::ToolName;
use toolset_store::ToolStore;

use crate::error::{EngineError, EngineResult};

/// Resolves dependency edges over the tools of a store.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    store: &'a ToolStore,
}

impl<'a> DependencyResolver<'a> {
    /// Creates a resolver over `store`.
    #[must_use]
    pub const fn new(store: &'a ToolStore) -> Self {
        Self { store }
    }

    /// Tools that must accompany `name`: its dependencies and the companions
    /// of its subcategory.
    fn support(&self, name: &ToolName) -> EngineResult<Vec<&'a ToolName>> {
        let entry = self.store.get(name.as_str())?;
        let mut support: Vec<&ToolName> = entry.metadata().dependencies().iter().collect();
        support.extend(self.store.auto_load(entry.layer()));
        Ok(support)
    }

    /// Closes `seeds` over dependencies and subcategory companions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] when a seed, dependency, or
    /// companion is not registered.
    pub fn closure(&self, seeds: &BTreeSet<ToolName>) -> EngineResult<BTreeSet<ToolName>> {
        self.closure_where(seeds, |_| true)
    }

    /// Like [`Self::closure`] but never expands into names rejected by `keep`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] when a visited tool is not
    /// registered.
    pub fn closure_where<F>(&self, seeds: &BTreeSet<ToolName>, keep: F) -> EngineResult<BTreeSet<ToolName>>
    where
        F: Fn(&ToolName) -> bool,
    {
        let mut closed = BTreeSet::new();
        let mut pending: Vec<ToolName> = seeds.iter().filter(|name| keep(*name)).cloned().collect();

        while let Some(name) = pending.pop() {
            if closed.contains(&name) {
                continue;
            }
            for next in self.support(&name)? {
                if !closed.contains(next) && keep(next) {
                    pending.push(next.clone());
                }
            }
            closed.insert(name);
        }
        Ok(closed)
    }

    /// Orders `set` so that every tool follows its dependencies.
    ///
    /// Edges are restricted to `set`. Ties are broken by name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CyclicDependency`] when the edges form a cycle
    /// and [`EngineError::UnknownTool`] for unregistered members.
    pub fn order(&self, set: &BTreeSet<ToolName>) -> EngineResult<Vec<ToolName>> {
        let graph = self.graph(set)?;
        ensure_acyclic(&graph)?;

        let mut indegree: BTreeMap<NodeIndex, usize> = graph
            .node_indices()
            .map(|node| (node, graph.neighbors_directed(node, Direction::Incoming).count()))
            .collect();
        let mut ready: BinaryHeap<Reverse<(&ToolName, NodeIndex)>> = indegree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| Reverse((graph[*node], *node)))
            .collect();

        let mut ordered = Vec::with_capacity(graph.node_count());
        while let Some(Reverse((name, node))) = ready.pop() {
            ordered.push(name.clone());
            for dependent in graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(degree) = indegree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse((graph[dependent], dependent)));
                    }
                }
            }
        }
        Ok(ordered)
    }

    /// Checks the whole catalog: every dependency and companion is
    /// registered and the dependency graph is acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] or
    /// [`EngineError::CyclicDependency`].
    pub fn validate_catalog(&self) -> EngineResult<()> {
        let everything: BTreeSet<ToolName> =
            self.store.all().map(|entry| entry.name().clone()).collect();
        for name in &everything {
            for support in self.support(name)? {
                if !self.store.contains(support.as_str()) {
                    return Err(EngineError::UnknownTool {
                        name: support.to_string(),
                    });
                }
            }
        }
        let graph = self.graph(&everything)?;
        ensure_acyclic(&graph)
    }

    /// Members of `within` that depend, directly or transitively, on any tool
    /// in `removed`.
    #[must_use]
    pub fn dependents(&self, removed: &BTreeSet<ToolName>, within: &BTreeSet<ToolName>) -> BTreeSet<ToolName> {
        let mut gone = removed.clone();
        let mut dependents = BTreeSet::new();
        loop {
            let newly: Vec<ToolName> = within
                .iter()
                .filter(|name| !gone.contains(*name))
                .filter(|name| {
                    self.store.get(name.as_str()).is_ok_and(|entry| {
                        entry.metadata().dependencies().iter().any(|dep| gone.contains(dep))
                    })
                })
                .cloned()
                .collect();
            if newly.is_empty() {
                return dependents;
            }
            for name in newly {
                gone.insert(name.clone());
                dependents.insert(name);
            }
        }
    }

    fn graph<'s>(&self, set: &'s BTreeSet<ToolName>) -> EngineResult<DiGraph<&'s ToolName, ()>> {
        let mut graph = DiGraph::new();
        let nodes: BTreeMap<&ToolName, NodeIndex> =
            set.iter().map(|name| (name, graph.add_node(name))).collect();

        for (name, node) in &nodes {
            let entry = self.store.get(name.as_str())?;
            for dep in entry.metadata().dependencies() {
                if let Some(dep_node) = nodes.get(dep) {
                    graph.add_edge(*dep_node, *node, ());
                }
            }
        }
        Ok(graph)
    }
}

fn ensure_acyclic(graph: &DiGraph<&ToolName, ()>) -> EngineResult<()> {
    for component in tarjan_scc(graph) {
        let looped = match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            members => members.len() > 1,
        };
        if looped {
            let mut cycle: Vec<ToolName> =
                component.iter().map(|node| ToolName::clone(graph[*node])).collect();
            cycle.sort();
            return Err(EngineError::CyclicDependency { cycle });
        }
    }
    Ok(())
}
