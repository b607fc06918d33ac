//! Error types for the stackplan compiler.
//!
//! This module provides the error hierarchy for every phase of a planning
//! run: configuration loading, the graph pipeline itself, and artifact
//! storage.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for stackplan.
#[derive(Debug, Error)]
pub enum StackplanError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource graph errors raised by the planning pipeline.
    #[error("{stage} stage failed: {0}", stage = .0.stage())]
    Graph(#[from] GraphError),

    /// Artifact storage errors.
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The stack file was not found.
    #[error("Stack file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The stack file could not be parsed.
    #[error("Failed to parse stack file: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Stack validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },
}

/// Pipeline stage in which a graph error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Declaring nodes into the declaration set.
    Declare,
    /// Binding references into edges.
    Resolve,
    /// Assembling the graph.
    Build,
    /// Ordering the graph.
    Plan,
    /// Producing the final plan.
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Declare => "declare",
            Self::Resolve => "resolve",
            Self::Build => "build",
            Self::Plan => "plan",
            Self::Emit => "emit",
        };
        write!(f, "{s}")
    }
}

/// Errors raised while turning declarations into a plan.
///
/// Every variant is terminal for the current planning pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two resources share the same id.
    #[error("Duplicate resource id: {id}")]
    DuplicateId {
        /// The duplicated id.
        id: String,
    },

    /// A reference names a resource, or an output value, that does not exist.
    #[error("Resource '{source_id}' property '{property}' references unknown {target_id}.{output}")]
    UnknownReference {
        /// Resource holding the reference.
        source_id: String,
        /// Property path of the reference.
        property: String,
        /// Referenced resource id.
        target_id: String,
        /// Referenced output name.
        output: String,
    },

    /// A reference names an output the target's kind never produces.
    #[error(
        "Resource '{source_id}' property '{property}' references output '{output}' \
         which kind '{kind}' of '{target_id}' does not produce"
    )]
    UnknownOutput {
        /// Resource holding the reference.
        source_id: String,
        /// Property path of the reference.
        property: String,
        /// Referenced resource id.
        target_id: String,
        /// Kind of the referenced resource.
        kind: String,
        /// Referenced output name.
        output: String,
    },

    /// An edge points at a resource missing from the node set.
    #[error("Edge {from} -> {to} references a resource that is not in the graph")]
    DanglingEdge {
        /// Dependency end of the edge.
        from: String,
        /// Dependent end of the edge.
        to: String,
    },

    /// The references form a cycle.
    #[error("Dependency cycle detected: {}", format_cycle(.cycle))]
    CycleDetected {
        /// Resource ids forming the cycle, in reference order.
        cycle: Vec<String>,
    },

    /// A property still holds an unresolved reference at emission time.
    #[error("Resource '{id}' property '{property}' still holds an unresolved reference")]
    UnresolvedProperty {
        /// Resource id.
        id: String,
        /// Property path.
        property: String,
    },

    /// The execution order and the graph disagree about a resource.
    #[error("Resource '{id}' is in only one of the graph and its execution order")]
    OrderMismatch {
        /// Resource id.
        id: String,
    },
}

/// Artifact storage errors.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Artifact file not found.
    #[error("Artifact not found: {path}")]
    NotFound {
        /// Path to the missing artifact.
        path: PathBuf,
    },

    /// Artifact is corrupted.
    #[error("Artifact is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Writing an artifact failed.
    #[error("Failed to write artifact: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
    },

    /// Lock acquisition failed.
    #[error("Failed to acquire output lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// The output directory is locked by another process.
    #[error("Output is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("Artifact serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Result type alias for stackplan operations.
pub type Result<T> = std::result::Result<T, StackplanError>;

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {first}", cycle.join(" -> ")),
        None => String::new(),
    }
}

impl StackplanError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the pipeline stage this error came from, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Graph(e) => Some(e.stage()),
            _ => None,
        }
    }
}

impl GraphError {
    /// Returns the pipeline stage that detects this error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::DuplicateId { .. } => Stage::Declare,
            Self::UnknownReference { .. } | Self::UnknownOutput { .. } => Stage::Resolve,
            Self::DanglingEdge { .. } => Stage::Build,
            Self::CycleDetected { .. } => Stage::Plan,
            Self::UnresolvedProperty { .. } | Self::OrderMismatch { .. } => Stage::Emit,
        }
    }

    /// Returns the resource ids this error is about.
    #[must_use]
    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            Self::DuplicateId { id }
            | Self::UnresolvedProperty { id, .. }
            | Self::OrderMismatch { id } => vec![id.as_str()],
            Self::UnknownReference {
                source_id,
                target_id,
                ..
            }
            | Self::UnknownOutput {
                source_id,
                target_id,
                ..
            } => vec![source_id.as_str(), target_id.as_str()],
            Self::DanglingEdge { from, to } => vec![from.as_str(), to.as_str()],
            Self::CycleDetected { cycle } => cycle.iter().map(String::as_str).collect(),
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::UnknownReference { .. } => "unknown_reference",
            Self::UnknownOutput { .. } => "unknown_output",
            Self::DanglingEdge { .. } => "dangling_edge",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::UnresolvedProperty { .. } => "unresolved_property",
            Self::OrderMismatch { .. } => "order_mismatch",
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl ArtifactError {
    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = GraphError::CycleDetected {
            cycle: vec![String::from("a"), String::from("b")],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: a -> b -> a");
        assert_eq!(err.stage(), Stage::Plan);
    }

    #[test]
    fn test_top_level_message_names_stage() {
        let err = StackplanError::from(GraphError::DuplicateId {
            id: String::from("net"),
        });
        assert_eq!(err.to_string(), "declare stage failed: Duplicate resource id: net");
        assert_eq!(err.stage(), Some(Stage::Declare));
    }

    #[test]
    fn test_node_ids() {
        let err = GraphError::UnknownOutput {
            source_id: String::from("db"),
            property: String::from("vpc"),
            target_id: String::from("net"),
            kind: String::from("network"),
            output: String::from("nope"),
        };
        assert_eq!(err.node_ids(), vec!["db", "net"]);
        assert_eq!(err.kind_name(), "unknown_output");
    }
}
