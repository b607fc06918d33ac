//! Planning pipeline.
//!
//! This module drives a declaration set through every stage of a planning
//! pass: resolve references, build the graph, order it, and emit the plan.
//! Each pass works on its own snapshot and fails fast at the first stage
//! that detects a defect.

use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{DeclarationHasher, StackConfig};
use crate::error::GraphError;
use crate::graph::{Graph, GraphBuilder, ReferenceResolver};
use crate::model::{Declarations, KindRegistry, KindTable};
use crate::planner::{ExecutionOrder, Plan, PlanEmitter, TopologicalPlanner};

/// Stages of a planning pass, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineState {
    /// Nodes are declared; references are still symbolic.
    Declared,
    /// References are bound and edges derived.
    Resolved,
    /// The graph is assembled.
    Built,
    /// The graph is ordered.
    Planned,
    /// The plan is emitted.
    Emitted,
}

impl PipelineState {
    /// The state that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Declared => Some(Self::Resolved),
            Self::Resolved => Some(Self::Built),
            Self::Built => Some(Self::Planned),
            Self::Planned => Some(Self::Emitted),
            Self::Emitted => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Declared => "declared",
            Self::Resolved => "resolved",
            Self::Built => "built",
            Self::Planned => "planned",
            Self::Emitted => "emitted",
        };
        write!(f, "{s}")
    }
}

/// A graph that has been ordered but not yet emitted.
#[derive(Debug, Clone)]
pub struct PlannedGraph {
    /// Stage reached; always [`PipelineState::Planned`].
    pub state: PipelineState,
    /// The resolved graph.
    pub graph: Graph,
    /// Its apply order.
    pub order: ExecutionOrder,
    /// Hash of the declarations it was built from.
    pub source_hash: String,
}

/// Planning pipeline for one project and environment.
#[derive(Debug)]
pub struct Pipeline<R: KindRegistry = KindTable> {
    /// Registry of outputs per kind.
    registry: R,
    /// Project name stamped on plans.
    project: String,
    /// Environment name stamped on plans.
    environment: String,
    /// Hasher for source hashes.
    hasher: DeclarationHasher,
}

impl Pipeline<KindTable> {
    /// Creates a pipeline for a loaded stack file.
    #[must_use]
    pub fn from_config(config: &StackConfig) -> Self {
        Self::new(
            config.kind_table(),
            config.project.name.clone(),
            config.project.environment.clone(),
        )
    }
}

impl<R: KindRegistry> Pipeline<R> {
    /// Creates a pipeline backed by `registry`.
    #[must_use]
    pub fn new(registry: R, project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            registry,
            project: project.into(),
            environment: environment.into(),
            hasher: DeclarationHasher::new(),
        }
    }

    /// Runs a full pass and returns the plan.
    ///
    /// # Errors
    ///
    /// Returns the [`GraphError`] of the first stage that fails; its
    /// [`GraphError::stage`] names that stage.
    pub fn run(&self, declarations: &Declarations) -> Result<Plan, GraphError> {
        let planned = self.check(declarations)?;

        let plan = PlanEmitter::new(&self.project, &self.environment)
            .with_source_hash(&planned.source_hash)
            .emit(&planned.graph, &planned.order)
            .inspect_err(Self::report)?;
        Self::reached(PipelineState::Emitted);

        info!(
            "Planned {} resources in {} waves ({})",
            plan.len(),
            plan.wave_count(),
            self.hasher.short_hash(&plan.fingerprint)
        );
        Ok(plan)
    }

    /// Declares every resource of a stack file, then runs a full pass.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if two resources share an id,
    /// or the error of the first later stage that fails.
    pub fn run_config(&self, config: &StackConfig) -> Result<Plan, GraphError> {
        let declarations = config.to_declarations().inspect_err(Self::report)?;
        self.run(&declarations)
    }

    /// Runs a pass up to [`PipelineState::Planned`] without emitting.
    ///
    /// References whose output value is missing still produce edges, so a
    /// cycle is reported ahead of the missing value.
    ///
    /// # Errors
    ///
    /// Returns the [`GraphError`] of the first stage that fails.
    pub fn check(&self, declarations: &Declarations) -> Result<PlannedGraph, GraphError> {
        let source_hash = self.hasher.hash_declarations(declarations);
        debug!(
            "Planning {} declarations ({})",
            declarations.len(),
            self.hasher.short_hash(&source_hash)
        );

        let resolution = ReferenceResolver::new(&self.registry)
            .resolve_deferred(declarations)
            .inspect_err(Self::report)?;
        Self::reached(PipelineState::Resolved);

        let graph = GraphBuilder::new()
            .build(resolution.nodes, resolution.edges)
            .inspect_err(Self::report)?;
        Self::reached(PipelineState::Built);

        let order = TopologicalPlanner::new()
            .plan(&graph)
            .inspect_err(Self::report)?;
        if let Some(err) = resolution.unbound.into_iter().next() {
            Self::report(&err);
            return Err(err);
        }
        Self::reached(PipelineState::Planned);

        Ok(PlannedGraph {
            state: PipelineState::Planned,
            graph,
            order,
            source_hash,
        })
    }

    fn reached(state: PipelineState) {
        debug!("Pipeline reached {state}");
    }

    fn report(error: &GraphError) {
        warn!("Pipeline failed in {} stage ({}): {error}", error.stage(), error.kind_name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::model::{PropertyValue, ResourceKind, ResourceNode};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn props(entries: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(KindTable::new(), "ml-pipeline", "dev")
    }

    fn net_and_db(reverse: bool) -> Declarations {
        let net = ResourceNode::new("net", ResourceKind::Network, BTreeMap::new())
            .with_output("vpcId", json!("vpc-0a1b2c"));
        let db = ResourceNode::new(
            "db",
            ResourceKind::Database,
            props(&[
                ("vpc", PropertyValue::reference("net", "vpcId")),
                ("engine", PropertyValue::from("aurora-mysql")),
            ]),
        );

        let mut declarations = Declarations::new();
        let nodes = if reverse { vec![db, net] } else { vec![net, db] };
        for node in nodes {
            declarations.declare(node).unwrap();
        }
        declarations
    }

    #[test]
    fn test_net_and_db_end_to_end() {
        let plan = pipeline().run(&net_and_db(false)).unwrap();

        let ids: Vec<_> = plan.apply_steps().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["net", "db"]);

        let db = plan.step("db").unwrap();
        let net = plan.step("net").unwrap();
        assert_eq!(db.resolved_properties["vpc"], net.outputs["vpcId"]);
        assert_eq!(plan.project, "ml-pipeline");
        assert!(!plan.source_hash.is_empty());
    }

    #[test]
    fn test_mutual_reference_is_cycle() {
        let mut declarations = Declarations::new();
        declarations
            .declare(
                ResourceNode::new(
                    "a",
                    ResourceKind::Custom,
                    props(&[("x", PropertyValue::reference("b", "y"))]),
                )
                .with_output("x", json!("ax")),
            )
            .unwrap();
        declarations
            .declare(
                ResourceNode::new(
                    "b",
                    ResourceKind::Custom,
                    props(&[("y", PropertyValue::reference("a", "x"))]),
                )
                .with_output("y", json!("by")),
            )
            .unwrap();

        let err = pipeline().run(&declarations).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("a"), String::from("b")],
            }
        );
        assert_eq!(err.stage(), Stage::Plan);
    }

    #[test]
    fn test_mutual_reference_without_outputs_is_cycle() {
        let mut declarations = Declarations::new();
        declarations
            .declare_node(
                "a",
                ResourceKind::Custom,
                props(&[("x", PropertyValue::reference("b", "y"))]),
            )
            .unwrap();
        declarations
            .declare_node(
                "b",
                ResourceKind::Custom,
                props(&[("y", PropertyValue::reference("a", "x"))]),
            )
            .unwrap();

        let err = pipeline().run(&declarations).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("a"), String::from("b")],
            }
        );
        assert_eq!(err.stage(), Stage::Plan);
    }

    #[test]
    fn test_missing_value_reported_when_acyclic() {
        let mut declarations = Declarations::new();
        declarations
            .declare_node("net", ResourceKind::Network, BTreeMap::new())
            .unwrap();
        declarations
            .declare_node(
                "db",
                ResourceKind::Database,
                props(&[("vpc", PropertyValue::reference("net", "vpcId"))]),
            )
            .unwrap();

        let err = pipeline().check(&declarations).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownReference {
                source_id: String::from("db"),
                property: String::from("vpc"),
                target_id: String::from("net"),
                output: String::from("vpcId"),
            }
        );
        assert_eq!(err.stage(), Stage::Resolve);
    }

    #[test]
    fn test_network_self_reference_is_cycle() {
        let mut declarations = Declarations::new();
        declarations
            .declare(
                ResourceNode::new(
                    "NetworkStack",
                    ResourceKind::Network,
                    props(&[("vpc", PropertyValue::reference("NetworkStack", "vpcId"))]),
                )
                .with_output("vpcId", json!("vpc-1")),
            )
            .unwrap();

        let err = pipeline().run(&declarations).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                cycle: vec![String::from("NetworkStack")],
            }
        );
    }

    #[test]
    fn test_runs_are_byte_identical() {
        let first = pipeline().run(&net_and_db(false)).unwrap();
        let second = pipeline().run(&net_and_db(true)).unwrap();

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
    }

    #[test]
    fn test_unknown_reference_and_output() {
        let mut missing = Declarations::new();
        missing
            .declare_node(
                "db",
                ResourceKind::Database,
                props(&[("vpc", PropertyValue::reference("nowhere", "vpcId"))]),
            )
            .unwrap();
        let err = pipeline().run(&missing).unwrap_err();
        assert!(matches!(err, GraphError::UnknownReference { .. }));
        assert_eq!(err.stage(), Stage::Resolve);

        let mut wrong_output = net_and_db(false);
        wrong_output
            .declare_node(
                "api",
                ResourceKind::RestApi,
                props(&[("bucket", PropertyValue::reference("net", "bucketName"))]),
            )
            .unwrap();
        let err = pipeline().run(&wrong_output).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownOutput {
                source_id: String::from("api"),
                property: String::from("bucket"),
                target_id: String::from("net"),
                kind: String::from("network"),
                output: String::from("bucketName"),
            }
        );
    }

    #[test]
    fn test_duplicate_id_from_config() {
        let yaml = r"
project:
  name: p
resources:
  - id: raw
    kind: bucket
  - id: raw
    kind: table
";
        let config = crate::config::ConfigParser::new().parse_yaml(yaml, None).unwrap();
        let err = Pipeline::from_config(&config).run_config(&config).unwrap_err();

        assert_eq!(err, GraphError::DuplicateId { id: String::from("raw") });
        assert_eq!(err.stage(), Stage::Declare);
    }

    #[test]
    fn test_check_stops_before_emit() {
        let planned = pipeline().check(&net_and_db(false)).unwrap();

        assert_eq!(planned.state, PipelineState::Planned);
        assert_eq!(planned.order.apply_order(), ["net", "db"]);
        assert_eq!(planned.graph.edge_count(), 1);
    }

    #[test]
    fn test_init_template_plans() {
        let config = crate::config::ConfigParser::new()
            .parse_yaml(include_str!("../templates/stackplan.yaml"), None)
            .unwrap();
        assert!(crate::config::ConfigValidator::new().validate(&config).is_ok());

        let plan = Pipeline::from_config(&config).run_config(&config).unwrap();
        let ids: Vec<_> = plan.apply_steps().map(|s| s.id.as_str()).collect();

        assert_eq!(plan.len(), 11);
        assert_eq!(plan.wave_count(), 4);
        assert_eq!(ids.first(), Some(&"DBCredentialsSecret"));
        assert_eq!(ids.last(), Some(&"APIStack"));
        assert_eq!(
            plan.step("APIStack").unwrap().resolved_properties["integration"]["endpoint"],
            json!("ml-pipeline-inference")
        );
    }

    #[test]
    fn test_state_sequence() {
        let mut state = PipelineState::Declared;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            seen.push(next);
            state = next;
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(seen.last(), Some(&PipelineState::Emitted));
    }
}
