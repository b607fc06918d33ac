//! Resource kinds and the output registry.
//!
//! Each kind is a closed enum variant; the outputs a kind produces once
//! applied are looked up in a capability table instead of being encoded in
//! per-kind types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Category of an infrastructure resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Virtual network with subnets and security groups.
    Network,
    /// Managed model serving endpoint.
    ModelEndpoint,
    /// Managed model training job.
    TrainingJob,
    /// Object storage bucket.
    Bucket,
    /// Key-value or document table.
    Table,
    /// Relational database cluster.
    Database,
    /// Stored secret.
    Secret,
    /// REST API gateway.
    RestApi,
    /// GraphQL sync API.
    GraphqlApi,
    /// Analytics dashboard and data set.
    Analytics,
    /// IAM role.
    Role,
    /// Anything else; outputs are whatever the resource declares.
    Custom,
}

/// Every built-in kind, in declaration order.
pub const ALL_KINDS: &[ResourceKind] = &[
    ResourceKind::Network,
    ResourceKind::ModelEndpoint,
    ResourceKind::TrainingJob,
    ResourceKind::Bucket,
    ResourceKind::Table,
    ResourceKind::Database,
    ResourceKind::Secret,
    ResourceKind::RestApi,
    ResourceKind::GraphqlApi,
    ResourceKind::Analytics,
    ResourceKind::Role,
    ResourceKind::Custom,
];

impl ResourceKind {
    /// Outputs this kind produces, or `None` for an open set.
    #[must_use]
    pub const fn builtin_outputs(self) -> Option<&'static [&'static str]> {
        let outputs: &'static [&'static str] = match self {
            Self::Network => &[
                "vpcId",
                "vpcCidr",
                "publicSubnetIds",
                "privateSubnetIds",
                "securityGroupId",
            ],
            Self::ModelEndpoint => &["endpointName", "endpointArn", "endpointUrl"],
            Self::TrainingJob => &["trainingJobName", "trainingJobArn", "modelArtifactUri"],
            Self::Bucket => &["bucketName", "bucketArn", "bucketDomainName"],
            Self::Table => &["tableName", "tableArn", "streamArn"],
            Self::Database => &["clusterArn", "clusterEndpoint", "port", "databaseName"],
            Self::Secret => &["secretArn", "secretName"],
            Self::RestApi => &["apiId", "apiUrl", "rootResourceId"],
            Self::GraphqlApi => &["apiId", "graphqlUrl", "apiKey"],
            Self::Analytics => &["dashboardId", "dashboardUrl", "dataSetArn"],
            Self::Role => &["roleArn", "roleName"],
            Self::Custom => return None,
        };
        Some(outputs)
    }

    /// The serialized name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::ModelEndpoint => "model_endpoint",
            Self::TrainingJob => "training_job",
            Self::Bucket => "bucket",
            Self::Table => "table",
            Self::Database => "database",
            Self::Secret => "secret",
            Self::RestApi => "rest_api",
            Self::GraphqlApi => "graphql_api",
            Self::Analytics => "analytics",
            Self::Role => "role",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of outputs a kind is allowed to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSet {
    /// Only the listed outputs.
    Closed(BTreeSet<String>),
    /// Any output the resource declares.
    Open,
}

impl OutputSet {
    /// Returns true if `output` belongs to the set.
    #[must_use]
    pub fn contains(&self, output: &str) -> bool {
        match self {
            Self::Closed(names) => names.contains(output),
            Self::Open => true,
        }
    }
}

/// Looks up the outputs a resource kind produces.
pub trait KindRegistry {
    /// Returns the valid output names for `kind`.
    fn valid_outputs(&self, kind: ResourceKind) -> OutputSet;
}

/// Built-in kind registry, extendable per kind.
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    extra: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl KindTable {
    /// Creates a table holding only the built-in outputs.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            extra: BTreeMap::new(),
        }
    }

    /// Registers an additional output for a kind.
    pub fn add_output(&mut self, kind: ResourceKind, output: impl Into<String>) {
        self.extra.entry(kind).or_default().insert(output.into());
    }

    /// Builds a table from a per-kind map of extra outputs.
    #[must_use]
    pub fn with_extra_outputs(extra: &BTreeMap<ResourceKind, Vec<String>>) -> Self {
        let mut table = Self::new();
        for (kind, outputs) in extra {
            for output in outputs {
                table.add_output(*kind, output.clone());
            }
        }
        table
    }
}

impl KindRegistry for KindTable {
    fn valid_outputs(&self, kind: ResourceKind) -> OutputSet {
        let Some(builtin) = kind.builtin_outputs() else {
            return OutputSet::Open;
        };

        let mut names: BTreeSet<String> = builtin.iter().map(|s| (*s).to_string()).collect();
        if let Some(extra) = self.extra.get(&kind) {
            names.extend(extra.iter().cloned());
        }
        OutputSet::Closed(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_outputs() {
        let table = KindTable::new();
        let outputs = table.valid_outputs(ResourceKind::Network);
        assert!(outputs.contains("vpcId"));
        assert!(!outputs.contains("bucketName"));
    }

    #[test]
    fn test_custom_is_open() {
        let table = KindTable::new();
        assert_eq!(table.valid_outputs(ResourceKind::Custom), OutputSet::Open);
        assert!(table.valid_outputs(ResourceKind::Custom).contains("anything"));
    }

    #[test]
    fn test_extra_outputs() {
        let mut table = KindTable::new();
        table.add_output(ResourceKind::Bucket, "websiteUrl");
        assert!(table.valid_outputs(ResourceKind::Bucket).contains("websiteUrl"));
        assert!(!table.valid_outputs(ResourceKind::Table).contains("websiteUrl"));
    }

    #[test]
    fn test_kind_serde_names() {
        let kind: ResourceKind = serde_yaml::from_str("model_endpoint").unwrap();
        assert_eq!(kind, ResourceKind::ModelEndpoint);
        assert_eq!(kind.to_string(), "model_endpoint");
        assert_eq!(ALL_KINDS.len(), 12);
    }
}
