//! Static resolution plan
//!
//! Walks the declared dependencies of a set of targets and orders the
//! reachable subgraph so that every prerequisite precedes its consumers.
//! Cycles are reported with their full path before any asset is touched.

use std::collections::HashSet;

use forge_asset::{AssetKey, Registry};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::error::StoreError;

/// Dependency subgraph reachable from a set of targets
///
/// Edges point from consumer to prerequisite.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    graph: DiGraphMap<AssetKey, ()>,
    order: Vec<AssetKey>,
}

impl ResolutionPlan {
    /// Build the plan for `targets`
    ///
    /// # Errors
    /// Returns [`StoreError::UnknownAsset`] for keys missing from the registry
    /// and [`StoreError::DependencyCycle`] when the subgraph is cyclic.
    pub fn build(registry: &Registry, targets: &[AssetKey]) -> Result<Self, StoreError> {
        let mut graph = DiGraphMap::new();
        let mut visited = HashSet::new();
        let mut pending: Vec<AssetKey> = targets.iter().rev().copied().collect();

        while let Some(key) = pending.pop() {
            if !visited.insert(key) {
                continue;
            }
            let deps = registry
                .dependencies_of(&key)
                .ok_or(StoreError::UnknownAsset { key })?;
            graph.add_node(key);
            for dep in deps.iter().rev() {
                graph.add_edge(key, *dep, ());
                pending.push(*dep);
            }
        }

        let mut order = toposort(&graph, None).map_err(|cycle| StoreError::DependencyCycle {
            path: cycle_through(&graph, cycle.node_id()),
        })?;
        order.reverse();
        Ok(Self { graph, order })
    }

    /// Keys in resolution order, prerequisites first
    #[must_use]
    pub fn order(&self) -> &[AssetKey] {
        &self.order
    }

    /// Direct prerequisites of a planned key
    #[must_use]
    pub fn dependencies(&self, key: AssetKey) -> Vec<AssetKey> {
        self.graph
            .neighbors_directed(key, Direction::Outgoing)
            .collect()
    }

    /// Direct consumers of a planned key
    #[must_use]
    pub fn dependents(&self, key: AssetKey) -> Vec<AssetKey> {
        self.graph
            .neighbors_directed(key, Direction::Incoming)
            .collect()
    }

    /// Whether the key is part of the plan
    #[must_use]
    pub fn contains(&self, key: AssetKey) -> bool {
        self.graph.contains_node(key)
    }

    /// Number of planned assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is planned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of dependency edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Graphviz rendering of the subgraph
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph assets {\n");
        for key in &self.order {
            out.push_str(&format!("    \"{key}\";\n"));
        }
        for key in &self.order {
            for dep in self.dependencies(*key) {
                out.push_str(&format!("    \"{key}\" -> \"{dep}\";\n"));
            }
        }
        out.push_str("}\n");
        out
    }
}

/// First cycle reachable from `start`, as `k -> ... -> k`
fn cycle_through(graph: &DiGraphMap<AssetKey, ()>, start: AssetKey) -> Vec<AssetKey> {
    fn walk(
        graph: &DiGraphMap<AssetKey, ()>,
        node: AssetKey,
        stack: &mut Vec<AssetKey>,
        done: &mut HashSet<AssetKey>,
    ) -> Option<Vec<AssetKey>> {
        stack.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            if let Some(pos) = stack.iter().position(|k| *k == next) {
                let mut path = stack[pos..].to_vec();
                path.push(next);
                return Some(path);
            }
            if !done.contains(&next) {
                if let Some(path) = walk(graph, next, stack, done) {
                    return Some(path);
                }
            }
        }
        stack.pop();
        done.insert(node);
        None
    }

    walk(graph, start, &mut Vec::new(), &mut HashSet::new()).unwrap_or_else(|| vec![start, start])
}
