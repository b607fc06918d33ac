//! Topological ordering and cycle detection.
//!
//! Nodes are placed in waves: wave 0 holds every resource that references
//! nothing, wave `n` holds resources whose deepest dependency sits in wave
//! `n - 1`. Inside a wave, ids are sorted ascending so the order is fully
//! deterministic.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::GraphError;
use crate::graph::Graph;

/// Planner computing apply order for a graph.
#[derive(Debug, Default)]
pub struct TopologicalPlanner;

/// Apply order of a validated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOrder {
    /// Resource ids in apply order.
    order: Vec<String>,
    /// Wave index of each entry in `order`.
    waves: Vec<usize>,
}

impl TopologicalPlanner {
    /// Creates a new planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Orders the graph for apply.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CycleDetected`] with the full cycle if any
    /// resource cannot be placed.
    pub fn plan(&self, graph: &Graph) -> Result<ExecutionOrder, GraphError> {
        let mut pending: BTreeMap<&str, usize> = graph
            .node_ids()
            .map(|id| (id, graph.dependencies(id).count()))
            .collect();

        let mut current: Vec<&str> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        let mut waves = Vec::with_capacity(graph.node_count());
        let mut wave = 0;

        while !current.is_empty() {
            let mut next = BTreeSet::new();
            for id in &current {
                pending.remove(id);
                for dependent in graph.dependents(id) {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count = count.saturating_sub(1);
                        if *count == 0 {
                            next.insert(dependent);
                        }
                    }
                }
                order.push((*id).to_string());
                waves.push(wave);
            }

            debug!("Wave {wave}: {}", current.join(", "));
            current = next.into_iter().collect();
            wave += 1;
        }

        if !pending.is_empty() {
            let remaining: BTreeSet<&str> = pending.keys().copied().collect();
            let cycle = find_cycle(graph, &remaining);
            warn!("Dependency cycle: {}", cycle.join(" -> "));
            return Err(GraphError::CycleDetected { cycle });
        }

        Ok(ExecutionOrder { order, waves })
    }
}

/// Walks dependencies inside the unplaceable set until a node repeats.
///
/// Every unplaced node still has an unplaced dependency, so the walk always
/// closes a loop. The cycle is rotated to start at its smallest id.
fn find_cycle(graph: &Graph, remaining: &BTreeSet<&str>) -> Vec<String> {
    let Some(mut current) = remaining.first().copied() else {
        return Vec::new();
    };

    let mut path: Vec<&str> = Vec::new();
    let mut position: BTreeMap<&str, usize> = BTreeMap::new();

    loop {
        if let Some(&start) = position.get(current) {
            let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
            let smallest = cycle
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.cmp(b.1))
                .map_or(0, |(i, _)| i);
            cycle.rotate_left(smallest);
            return cycle;
        }

        position.insert(current, path.len());
        path.push(current);

        match graph.dependencies(current).find(|dep| remaining.contains(dep)) {
            Some(dep) => current = dep,
            None => return path.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl ExecutionOrder {
    /// Resource ids in apply order.
    #[must_use]
    pub fn apply_order(&self) -> &[String] {
        &self.order
    }

    /// Resource ids in destroy order, the exact reverse of apply order.
    pub fn destroy_order(&self) -> impl Iterator<Item = &str> {
        self.order.iter().rev().map(String::as_str)
    }

    /// Wave index of a resource.
    #[must_use]
    pub fn wave_of(&self, id: &str) -> Option<usize> {
        self.order
            .iter()
            .position(|candidate| candidate == id)
            .map(|i| self.waves[i])
    }

    /// Resources grouped by wave, in apply order.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<&str>> {
        let mut grouped: Vec<Vec<&str>> = Vec::new();
        for (id, wave) in self.order.iter().zip(&self.waves) {
            if grouped.len() <= *wave {
                grouped.push(Vec::new());
            }
            if let Some(group) = grouped.last_mut() {
                group.push(id.as_str());
            }
        }
        grouped
    }

    /// Iterates `(id, wave)` pairs in apply order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.order
            .iter()
            .zip(self.waves.iter().copied())
            .map(|(id, wave)| (id.as_str(), wave))
    }

    /// Number of ordered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is ordered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphBuilder};
    use crate::model::{ResourceKind, ResourceNode};

    fn graph(ids: &[&str], edges: &[(&str, &str)]) -> Graph {
        let nodes = ids
            .iter()
            .map(|id| ResourceNode::new(*id, ResourceKind::Custom, BTreeMap::new()))
            .collect();
        let edges = edges.iter().map(|(from, to)| Edge::new(*from, *to));
        GraphBuilder::new().build(nodes, edges).unwrap()
    }

    #[test]
    fn test_dependencies_come_first() {
        let g = graph(
            &["api", "db", "net", "endpoint", "bucket"],
            &[("net", "db"), ("net", "endpoint"), ("endpoint", "api"), ("db", "api")],
        );
        let order = TopologicalPlanner::new().plan(&g).unwrap();

        for edge in g.edges() {
            let from = order.apply_order().iter().position(|id| *id == edge.from).unwrap();
            let to = order.apply_order().iter().position(|id| *id == edge.to).unwrap();
            assert!(from < to, "{} should precede {}", edge.from, edge.to);
        }
    }

    #[test]
    fn test_waves_tie_break_by_id() {
        let g = graph(
            &["api", "db", "net", "endpoint", "bucket"],
            &[("net", "db"), ("net", "endpoint"), ("endpoint", "api"), ("db", "api")],
        );
        let order = TopologicalPlanner::new().plan(&g).unwrap();

        assert_eq!(
            order.waves(),
            vec![vec!["bucket", "net"], vec!["db", "endpoint"], vec!["api"]]
        );
        assert_eq!(order.wave_of("api"), Some(2));
        assert_eq!(order.wave_of("ghost"), None);
    }

    #[test]
    fn test_depth_uses_longest_path() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        let order = TopologicalPlanner::new().plan(&g).unwrap();
        assert_eq!(order.apply_order(), &["a", "b", "c"]);
        assert_eq!(order.wave_of("c"), Some(2));
    }

    #[test]
    fn test_destroy_is_reverse_of_apply() {
        let g = graph(&["net", "db", "api"], &[("net", "db"), ("db", "api")]);
        let order = TopologicalPlanner::new().plan(&g).unwrap();

        let destroy: Vec<_> = order.destroy_order().collect();
        assert_eq!(destroy, vec!["api", "db", "net"]);
    }

    #[test]
    fn test_two_node_cycle() {
        // a references b and b references a
        let g = graph(&["a", "b"], &[("b", "a"), ("a", "b")]);
        let err = TopologicalPlanner::new().plan(&g).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("a"), String::from("b")],
            }
        );
    }

    #[test]
    fn test_self_reference_cycle() {
        let g = graph(&["network", "storage"], &[("network", "network"), ("network", "storage")]);
        let err = TopologicalPlanner::new().plan(&g).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("network")],
            }
        );
    }

    #[test]
    fn test_cycle_reached_through_tail() {
        // x depends on y, y and z depend on each other
        let g = graph(&["x", "y", "z"], &[("y", "x"), ("z", "y"), ("y", "z")]);
        let err = TopologicalPlanner::new().plan(&g).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("y"), String::from("z")],
            }
        );
    }

    #[test]
    fn test_empty_graph() {
        let order = TopologicalPlanner::new().plan(&Graph::default()).unwrap();
        assert!(order.is_empty());
        assert!(order.waves().is_empty());
    }
}
