//! Stack file specification types.
//!
//! This module defines the structs that map to `stackplan.yaml`. A stack
//! file fully describes the resources to plan; nothing else is read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::GraphError;
use crate::model::{Declarations, KindTable, PropertyValue, ResourceKind, ResourceNode};

/// The root structure of a stack file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackConfig {
    /// Project-level configuration.
    pub project: ProjectConfig,
    /// Where synthesized plans are written.
    #[serde(default)]
    pub output: OutputConfig,
    /// Extra outputs per kind, on top of the built-in ones.
    #[serde(default)]
    pub kinds: BTreeMap<ResourceKind, Vec<String>>,
    /// Declared resources.
    #[serde(default)]
    pub resources: Vec<ResourceDeclaration>,
}

/// Project-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Unique name for the project.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Output configuration for synthesized plans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Output directory, relative to the stack file.
    #[serde(default = "default_output_path")]
    pub path: String,
    /// Serialization format of written plans.
    #[serde(default)]
    pub format: PlanFormat,
}

/// Plan serialization formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// YAML.
    Yaml,
}

/// A single resource declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDeclaration {
    /// Unique resource id.
    pub id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Declared properties; values may be references.
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Output values the resource produces once applied.
    #[serde(default)]
    pub outputs: BTreeMap<String, serde_json::Value>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: PlanFormat::default(),
        }
    }
}

fn default_environment() -> String {
    String::from("dev")
}

fn default_output_path() -> String {
    String::from("stackplan.out")
}

impl PlanFormat {
    /// File extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl StackConfig {
    /// Returns the fully qualified project name including environment.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.project.name, self.project.environment)
    }

    /// Returns resource ids in declaration order.
    #[must_use]
    pub fn resource_ids(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.id.as_str()).collect()
    }

    /// Builds the kind registry for this stack.
    #[must_use]
    pub fn kind_table(&self) -> KindTable {
        KindTable::with_extra_outputs(&self.kinds)
    }

    /// Declares every resource into a fresh declaration set.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if two resources share an id.
    pub fn to_declarations(&self) -> Result<Declarations, GraphError> {
        let mut declarations = Declarations::new();
        for resource in &self.resources {
            declarations.declare(resource.to_node())?;
        }
        Ok(declarations)
    }
}

impl ResourceDeclaration {
    /// Converts the declaration into a resource node.
    #[must_use]
    pub fn to_node(&self) -> ResourceNode {
        ResourceNode {
            id: self.id.clone(),
            kind: self.kind,
            properties: self.properties.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_defaults() {
        let output = OutputConfig::default();
        assert_eq!(output.path, "stackplan.out");
        assert_eq!(output.format, PlanFormat::Json);
        assert_eq!(PlanFormat::Yaml.extension(), "yaml");
    }

    #[test]
    fn test_duplicate_declarations() {
        let resource = ResourceDeclaration {
            id: String::from("net"),
            kind: ResourceKind::Network,
            properties: BTreeMap::new(),
            outputs: BTreeMap::new(),
        };
        let config = StackConfig {
            project: ProjectConfig {
                name: String::from("p"),
                environment: String::from("dev"),
            },
            output: OutputConfig::default(),
            kinds: BTreeMap::new(),
            resources: vec![resource.clone(), resource],
        };

        assert_eq!(
            config.to_declarations().unwrap_err(),
            GraphError::DuplicateId { id: String::from("net") }
        );
        assert_eq!(config.qualified_name(), "p-dev");
    }
}
