//! Reference resolution.
//!
//! Binds every symbolic reference in the declaration set to the output
//! value it names and derives the dependency edges those references imply.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::error::GraphError;
use crate::model::{
    Declarations, KindRegistry, PropertyValue, Reference, ResolvedRef, ResourceNode,
};

use super::builder::Edge;

/// Resolver for cross-resource references.
#[derive(Debug)]
pub struct ReferenceResolver<'a, R: KindRegistry + ?Sized> {
    /// Registry of outputs per kind.
    registry: &'a R,
}

/// Output of the resolver: nodes with filled-in values and derived edges.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Resolved nodes, in ascending id order.
    pub nodes: Vec<ResourceNode>,
    /// One edge per distinct (target, dependent) pair.
    pub edges: BTreeSet<Edge>,
    /// References whose target exists and whose output is valid for the
    /// target's kind, but whose value the target does not declare. They
    /// still contribute an edge and stay unresolved in `nodes`.
    pub unbound: Vec<GraphError>,
}

/// Outcome of binding a reference whose target and output are known.
enum Binding {
    Bound(ResolvedRef),
    /// The target declares no value for the output.
    Unbound(GraphError),
}

impl Resolution {
    /// Fails with the first unbound reference, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownReference`] for the first reference
    /// whose output value is missing.
    pub fn ensure_bound(&self) -> Result<(), GraphError> {
        self.unbound.first().map_or(Ok(()), |err| Err(err.clone()))
    }
}

impl<'a, R: KindRegistry + ?Sized> ReferenceResolver<'a, R> {
    /// Creates a resolver backed by `registry`.
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Resolves all references in `declarations`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownReference`] if a referenced resource or
    /// output value does not exist, and [`GraphError::UnknownOutput`] if the
    /// output is not one the target's kind produces.
    pub fn resolve(&self, declarations: &Declarations) -> Result<Resolution, GraphError> {
        let resolution = self.resolve_deferred(declarations)?;
        resolution.ensure_bound()?;
        Ok(resolution)
    }

    /// Resolves all references, deferring missing output values.
    ///
    /// Every reference to an existing resource and a valid output yields an
    /// edge, so the graph can be checked for cycles before a missing value
    /// is reported. Missing values are collected in [`Resolution::unbound`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnknownReference`] if a referenced resource
    /// does not exist, and [`GraphError::UnknownOutput`] if the output is not
    /// one the target's kind produces.
    pub fn resolve_deferred(&self, declarations: &Declarations) -> Result<Resolution, GraphError> {
        let mut resolution = Resolution::default();

        for node in declarations.iter() {
            let mut properties = BTreeMap::new();
            for (name, value) in &node.properties {
                let resolved =
                    self.resolve_value(declarations, &node.id, name, value, &mut resolution)?;
                properties.insert(name.clone(), resolved);
            }

            resolution.nodes.push(ResourceNode {
                id: node.id.clone(),
                kind: node.kind,
                properties,
                outputs: node.outputs.clone(),
            });
        }

        info!(
            "Resolved {} resources into {} dependency edges ({} unbound)",
            resolution.nodes.len(),
            resolution.edges.len(),
            resolution.unbound.len()
        );
        Ok(resolution)
    }

    fn resolve_value(
        &self,
        declarations: &Declarations,
        source_id: &str,
        path: &str,
        value: &PropertyValue,
        resolution: &mut Resolution,
    ) -> Result<PropertyValue, GraphError> {
        match value {
            PropertyValue::Literal(_) => Ok(value.clone()),
            PropertyValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    self.resolve_value(declarations, source_id, &format!("{path}[{i}]"), item, resolution)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(PropertyValue::List),
            PropertyValue::Map(entries) => entries
                .iter()
                .map(|(key, item)| {
                    self.resolve_value(declarations, source_id, &format!("{path}.{key}"), item, resolution)
                        .map(|v| (key.clone(), v))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(PropertyValue::Map),
            PropertyValue::Reference(reference) => {
                let bound = self.bind(declarations, source_id, path, reference)?;
                resolution.edges.insert(Edge::new(&reference.target, source_id));
                Ok(match bound {
                    Binding::Bound(resolved) => PropertyValue::Resolved(resolved),
                    Binding::Unbound(err) => {
                        resolution.unbound.push(err);
                        value.clone()
                    }
                })
            }
            PropertyValue::Resolved(resolved) => {
                resolution.edges.insert(Edge::new(&resolved.reference.target, source_id));
                Ok(value.clone())
            }
        }
    }

    fn bind(
        &self,
        declarations: &Declarations,
        source_id: &str,
        path: &str,
        reference: &Reference,
    ) -> Result<Binding, GraphError> {
        let unknown_reference = || GraphError::UnknownReference {
            source_id: source_id.to_string(),
            property: path.to_string(),
            target_id: reference.target.clone(),
            output: reference.output.clone(),
        };

        let target = declarations.get(&reference.target).ok_or_else(unknown_reference)?;

        if !self.registry.valid_outputs(target.kind).contains(&reference.output) {
            return Err(GraphError::UnknownOutput {
                source_id: source_id.to_string(),
                property: path.to_string(),
                target_id: target.id.clone(),
                kind: target.kind.to_string(),
                output: reference.output.clone(),
            });
        }

        let Some(value) = target.outputs.get(&reference.output) else {
            debug!("Deferred {source_id}.{path}: {reference} has no declared value");
            return Ok(Binding::Unbound(unknown_reference()));
        };

        debug!("Bound {source_id}.{path} to {reference}");
        Ok(Binding::Bound(ResolvedRef {
            reference: reference.clone(),
            value: value.clone(),
        }))
    }
}
