//! Deployment plan types and emission.
//!
//! This module defines the plan handed to an external apply mechanism and
//! the emitter that produces it from a validated graph and its order.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::DeclarationHasher;
use crate::error::{ArtifactError, GraphError, Result};
use crate::graph::Graph;
use crate::model::ResourceKind;

use super::order::ExecutionOrder;

/// A complete, fully resolved deployment plan.
///
/// Carries no timestamps: emitting twice from the same declarations
/// serializes to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// Hash of the declaration set the plan was built from.
    pub source_hash: String,
    /// Hash of the plan steps.
    pub fingerprint: String,
    /// Steps in apply order.
    pub steps: Vec<PlanStep>,
}

/// A single resource in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Resource id.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Wave index; resources in one wave are independent of each other.
    pub wave: usize,
    /// Ids this resource depends on, sorted.
    pub depends_on: Vec<String>,
    /// Properties with every reference substituted.
    pub resolved_properties: BTreeMap<String, serde_json::Value>,
    /// Declared output values.
    pub outputs: BTreeMap<String, serde_json::Value>,
}

/// Emitter producing a [`Plan`] from a graph and its order.
#[derive(Debug, Default)]
pub struct PlanEmitter {
    /// Project name stamped on the plan.
    project: String,
    /// Environment name stamped on the plan.
    environment: String,
    /// Source hash stamped on the plan.
    source_hash: String,
    /// Hasher for the fingerprint.
    hasher: DeclarationHasher,
}

impl PlanEmitter {
    /// Creates an emitter for a project and environment.
    #[must_use]
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
            source_hash: String::new(),
            hasher: DeclarationHasher::new(),
        }
    }

    /// Sets the source hash recorded in the plan.
    #[must_use]
    pub fn with_source_hash(mut self, source_hash: impl Into<String>) -> Self {
        self.source_hash = source_hash.into();
        self
    }

    /// Emits the plan.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedProperty`] if a property still holds
    /// an unresolved reference, and [`GraphError::OrderMismatch`] if `order`
    /// was computed from a different graph.
    pub fn emit(&self, graph: &Graph, order: &ExecutionOrder) -> std::result::Result<Plan, GraphError> {
        if let Some(id) = graph.node_ids().find(|id| order.wave_of(id).is_none()) {
            return Err(GraphError::OrderMismatch { id: id.to_string() });
        }

        let mut steps = Vec::with_capacity(order.len());

        for (id, wave) in order.iter() {
            let node = graph
                .node(id)
                .ok_or_else(|| GraphError::OrderMismatch { id: id.to_string() })?;

            let mut resolved_properties = BTreeMap::new();
            for (name, value) in &node.properties {
                let json = value.to_resolved_json().ok_or_else(|| GraphError::UnresolvedProperty {
                    id: node.id.clone(),
                    property: value.first_unresolved(name).unwrap_or_else(|| name.clone()),
                })?;
                resolved_properties.insert(name.clone(), json);
            }

            steps.push(PlanStep {
                id: node.id.clone(),
                kind: node.kind,
                wave,
                depends_on: graph.dependencies(id).map(str::to_string).collect(),
                resolved_properties,
                outputs: node.outputs.clone(),
            });
        }

        let fingerprint = self.hasher.hash_steps(&steps);
        debug!("Emitted plan with {} steps ({})", steps.len(), self.hasher.short_hash(&fingerprint));

        Ok(Plan {
            project: self.project.clone(),
            environment: self.environment.clone(),
            source_hash: self.source_hash.clone(),
            fingerprint,
            steps,
        })
    }
}

impl Plan {
    /// Returns true if the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns the number of waves.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.steps.iter().map(|s| s.wave + 1).max().unwrap_or(0)
    }

    /// Looks up a step by resource id.
    #[must_use]
    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps in apply order.
    pub fn apply_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter()
    }

    /// Steps in destroy order, the reverse of apply order.
    pub fn destroy_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps.iter().rev()
    }

    /// Number of steps per kind.
    #[must_use]
    pub fn kind_counts(&self) -> BTreeMap<ResourceKind, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Serializes the plan as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ArtifactError::serialization(format!("Failed to serialize plan: {e}")).into())
    }

    /// Serializes the plan as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ArtifactError::serialization(format!("Failed to serialize plan: {e}")).into())
    }
}

impl std::fmt::Display for PlanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.wave, self.id, self.kind)?;
        if !self.depends_on.is_empty() {
            write!(f, " after {}", self.depends_on.join(", "))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "Nothing to deploy");
        }

        writeln!(
            f,
            "Deployment Plan for {}/{} ({} resources, {} waves):",
            self.project,
            self.environment,
            self.steps.len(),
            self.wave_count()
        )?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {i}. {step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphBuilder};
    use crate::model::{PropertyValue, Reference, ResolvedRef, ResourceNode};
    use crate::planner::TopologicalPlanner;
    use serde_json::json;

    fn resolved_graph() -> Graph {
        let net = ResourceNode::new("net", ResourceKind::Network, BTreeMap::new())
            .with_output("vpcId", json!("vpc-42"));
        let mut props = BTreeMap::new();
        props.insert(
            String::from("vpc"),
            PropertyValue::Resolved(ResolvedRef {
                reference: Reference::new("net", "vpcId"),
                value: json!("vpc-42"),
            }),
        );
        props.insert(String::from("engine"), PropertyValue::from("aurora-mysql"));
        let db = ResourceNode::new("db", ResourceKind::Database, props);

        GraphBuilder::new()
            .build(vec![net, db], vec![Edge::new("net", "db")])
            .unwrap()
    }

    #[test]
    fn test_emit_substitutes_values() {
        let graph = resolved_graph();
        let order = TopologicalPlanner::new().plan(&graph).unwrap();
        let plan = PlanEmitter::new("ml-pipeline", "dev").emit(&graph, &order).unwrap();

        let ids: Vec<_> = plan.apply_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["net", "db"]);

        let db = plan.step("db").unwrap();
        assert_eq!(db.resolved_properties["vpc"], json!("vpc-42"));
        assert_eq!(db.depends_on, vec![String::from("net")]);
        assert_eq!(db.wave, 1);
        assert_eq!(plan.wave_count(), 2);
    }

    #[test]
    fn test_emit_rejects_unresolved() {
        let mut props = BTreeMap::new();
        props.insert(
            String::from("subnets"),
            PropertyValue::List(vec![PropertyValue::reference("net", "privateSubnetIds")]),
        );
        let graph = GraphBuilder::new()
            .build(
                vec![ResourceNode::new("db", ResourceKind::Database, props)],
                Vec::new(),
            )
            .unwrap();
        let order = TopologicalPlanner::new().plan(&graph).unwrap();

        let err = PlanEmitter::new("p", "dev").emit(&graph, &order).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnresolvedProperty {
                id: String::from("db"),
                property: String::from("subnets[0]"),
            }
        );
    }

    #[test]
    fn test_emit_rejects_order_from_other_graph() {
        let graph = resolved_graph();
        let lone = GraphBuilder::new()
            .build(
                vec![ResourceNode::new("cache", ResourceKind::Table, BTreeMap::new())],
                Vec::new(),
            )
            .unwrap();
        let order = TopologicalPlanner::new().plan(&lone).unwrap();

        let err = PlanEmitter::new("p", "dev").emit(&graph, &order).unwrap_err();
        assert_eq!(err, GraphError::OrderMismatch { id: String::from("db") });
        assert_eq!(err.stage(), crate::error::Stage::Emit);

        let full_order = TopologicalPlanner::new().plan(&graph).unwrap();
        let err = PlanEmitter::new("p", "dev").emit(&lone, &full_order).unwrap_err();
        assert_eq!(err, GraphError::OrderMismatch { id: String::from("cache") });
    }

    #[test]
    fn test_json_is_stable() {
        let graph = resolved_graph();
        let order = TopologicalPlanner::new().plan(&graph).unwrap();
        let emitter = PlanEmitter::new("ml-pipeline", "dev").with_source_hash("abc");

        let first = emitter.emit(&graph, &order).unwrap().to_json().unwrap();
        let second = emitter.emit(&graph, &order).unwrap().to_json().unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"resolvedProperties\""));
        assert!(!first.contains("\"ref\""));
    }

    #[test]
    fn test_destroy_steps_reverse() {
        let graph = resolved_graph();
        let order = TopologicalPlanner::new().plan(&graph).unwrap();
        let plan = PlanEmitter::new("p", "dev").emit(&graph, &order).unwrap();

        let ids: Vec<_> = plan.destroy_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["db", "net"]);
        assert_eq!(plan.kind_counts()[&ResourceKind::Database], 1);
    }
}
