//! Graph assembly.
//!
//! Pure assembly of resolved nodes and edges into a [`Graph`]. No
//! resolution happens here; the builder only guards the graph invariants.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::error::GraphError;
use crate::model::ResourceNode;

/// Directed dependency: `to` must be applied after `from`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Edge {
    /// The resource being depended on.
    pub from: String,
    /// The dependent resource.
    pub to: String,
}

impl Edge {
    /// Creates an edge from a dependency to its dependent.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A frozen resource graph.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<String, ResourceNode>,
    edges: BTreeSet<Edge>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
}

/// Builder that assembles a [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    /// Creates a new graph builder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Assembles nodes and edges into a graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if two nodes share an id and
    /// [`GraphError::DanglingEdge`] if an edge endpoint is not a node.
    pub fn build(
        &self,
        nodes: Vec<ResourceNode>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Graph, GraphError> {
        let mut graph = Graph::default();

        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateId { id: node.id });
            }
            graph.dependencies.insert(node.id.clone(), BTreeSet::new());
            graph.dependents.insert(node.id.clone(), BTreeSet::new());
            graph.nodes.insert(node.id.clone(), node);
        }

        for edge in edges {
            let (Some(deps), true) = (
                graph.dependencies.get_mut(&edge.to),
                graph.nodes.contains_key(&edge.from),
            ) else {
                return Err(GraphError::DanglingEdge {
                    from: edge.from,
                    to: edge.to,
                });
            };
            deps.insert(edge.from.clone());
            if let Some(dependents) = graph.dependents.get_mut(&edge.from) {
                dependents.insert(edge.to.clone());
            }
            graph.edges.insert(edge);
        }

        debug!(
            "Built graph with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

impl Graph {
    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Iterates nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Iterates node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All edges, in sorted order.
    #[must_use]
    pub const fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Ids of the resources `id` references.
    pub fn dependencies(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dependencies
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Ids of the resources that reference `id`.
    pub fn dependents(&self, id: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Resources that reference nothing.
    #[must_use]
    pub fn roots(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Resources nothing references.
    #[must_use]
    pub fn leaves(&self) -> Vec<&str> {
        self.dependents
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Total node count.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge count.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    fn node(id: &str) -> ResourceNode {
        ResourceNode::new(id, ResourceKind::Custom, BTreeMap::new())
    }

    #[test]
    fn test_build_tracks_adjacency() {
        let graph = GraphBuilder::new()
            .build(
                vec![node("net"), node("db"), node("api")],
                vec![Edge::new("net", "db"), Edge::new("db", "api")],
            )
            .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.dependencies("db").collect::<Vec<_>>(), vec!["net"]);
        assert_eq!(graph.dependents("db").collect::<Vec<_>>(), vec!["api"]);
        assert_eq!(graph.roots(), vec!["net"]);
        assert_eq!(graph.leaves(), vec!["api"]);
    }

    #[test]
    fn test_dangling_edge() {
        let err = GraphBuilder::new()
            .build(vec![node("db")], vec![Edge::new("ghost", "db")])
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingEdge {
                from: String::from("ghost"),
                to: String::from("db"),
            }
        );

        let err = GraphBuilder::new()
            .build(vec![node("db")], vec![Edge::new("db", "ghost")])
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { .. }));
    }

    #[test]
    fn test_duplicate_nodes() {
        let err = GraphBuilder::new()
            .build(vec![node("db"), node("db")], Vec::new())
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateId { id: String::from("db") });
    }
}
