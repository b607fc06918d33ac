//! Resource nodes and the declaration set.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::GraphError;

use super::kind::ResourceKind;
use super::value::{PropertyValue, Reference};

/// A declared infrastructure resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    /// Identifier, unique within the graph.
    pub id: String,
    /// Resource category.
    pub kind: ResourceKind,
    /// Declared properties, possibly holding references.
    pub properties: BTreeMap<String, PropertyValue>,
    /// Output values this resource produces once applied.
    pub outputs: BTreeMap<String, serde_json::Value>,
}

impl ResourceNode {
    /// Creates a node with no outputs.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: ResourceKind,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            properties,
            outputs: BTreeMap::new(),
        }
    }

    /// Sets an output value.
    #[must_use]
    pub fn with_output(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.outputs.insert(name.into(), value);
        self
    }

    /// Returns every reference held by this node with its property path.
    #[must_use]
    pub fn references(&self) -> Vec<(String, &Reference)> {
        let mut refs = Vec::new();
        for (name, value) in &self.properties {
            value.collect_references(name, &mut refs);
        }
        refs
    }

    /// Returns the path of the first property still holding an unresolved reference.
    #[must_use]
    pub fn first_unresolved(&self) -> Option<String> {
        self.properties
            .iter()
            .find_map(|(name, value)| value.first_unresolved(name))
    }
}

/// The in-memory set of declared resources.
///
/// Keyed by id, so iteration order never depends on declaration order.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    nodes: BTreeMap<String, ResourceNode>,
}

impl Declarations {
    /// Creates an empty declaration set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }

    /// Declares a resource.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if the id is already declared.
    pub fn declare_node(
        &mut self,
        id: impl Into<String>,
        kind: ResourceKind,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<&ResourceNode, GraphError> {
        self.declare(ResourceNode::new(id, kind, properties))
    }

    /// Declares a fully constructed node, outputs included.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if the id is already declared.
    pub fn declare(&mut self, node: ResourceNode) -> Result<&ResourceNode, GraphError> {
        use std::collections::btree_map::Entry;

        match self.nodes.entry(node.id.clone()) {
            Entry::Occupied(_) => Err(GraphError::DuplicateId { id: node.id }),
            Entry::Vacant(slot) => {
                debug!("Declared {} '{}'", node.kind, node.id);
                let node = slot.insert(node);
                Ok(&*node)
            }
        }
    }

    /// Looks up a declared node.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    /// Iterates nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.values()
    }

    /// Number of declared nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_id_rejected() {
        let mut decls = Declarations::new();
        decls
            .declare_node("net", ResourceKind::Network, BTreeMap::new())
            .unwrap();

        let err = decls
            .declare_node("net", ResourceKind::Bucket, BTreeMap::new())
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateId { id: String::from("net") });
        assert_eq!(decls.len(), 1);
        assert_eq!(decls.get("net").unwrap().kind, ResourceKind::Network);
    }

    #[test]
    fn test_iteration_is_id_ordered() {
        let mut decls = Declarations::new();
        for id in ["zeta", "alpha", "mid"] {
            decls.declare_node(id, ResourceKind::Custom, BTreeMap::new()).unwrap();
        }
        let ids: Vec<_> = decls.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_references_with_paths() {
        let mut props = BTreeMap::new();
        props.insert(String::from("vpc"), PropertyValue::reference("net", "vpcId"));
        props.insert(String::from("name"), PropertyValue::from("db"));
        let node = ResourceNode::new("db", ResourceKind::Database, props);

        let refs = node.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].0, "vpc");
        assert_eq!(node.first_unresolved(), Some(String::from("vpc")));
    }
}
