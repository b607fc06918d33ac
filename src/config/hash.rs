//! Declaration hashing for change detection.
//!
//! This module provides deterministic hashing of stack declarations and
//! emitted plans, so that identical inputs always carry identical hashes
//! regardless of the order resources were written in.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::model::{Declarations, PropertyValue, ResourceNode};
use crate::planner::PlanStep;

use super::spec::StackConfig;

/// Hasher for declarations and plans.
#[derive(Debug, Default)]
pub struct DeclarationHasher;

impl DeclarationHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire stack file.
    ///
    /// Covers the project, extra kind outputs and every resource. The output
    /// location is not part of the hash.
    #[must_use]
    pub fn hash_config(&self, config: &StackConfig) -> String {
        let mut hasher = Sha256::new();

        feed_str(&mut hasher, &config.project.name);
        feed_str(&mut hasher, &config.project.environment);

        for (kind, outputs) in &config.kinds {
            feed_str(&mut hasher, kind.as_str());
            let mut outputs: Vec<_> = outputs.iter().collect();
            outputs.sort_unstable();
            for output in outputs {
                feed_str(&mut hasher, output);
            }
        }

        let mut resources: Vec<_> = config.resources.iter().map(|r| r.to_node()).collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));
        for node in &resources {
            feed_node(&mut hasher, node);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash of a declaration set.
    ///
    /// Declarations iterate by id, so the hash does not depend on the order
    /// resources were declared in.
    #[must_use]
    pub fn hash_declarations(&self, declarations: &Declarations) -> String {
        let mut hasher = Sha256::new();
        hasher.update((declarations.len() as u64).to_be_bytes());

        for node in declarations.iter() {
            feed_node(&mut hasher, node);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of emitted plan steps.
    #[must_use]
    pub fn hash_steps(&self, steps: &[PlanStep]) -> String {
        let mut hasher = Sha256::new();
        hasher.update((steps.len() as u64).to_be_bytes());

        for step in steps {
            feed_str(&mut hasher, &step.id);
            feed_str(&mut hasher, step.kind.as_str());
            hasher.update((step.wave as u64).to_be_bytes());

            hasher.update((step.depends_on.len() as u64).to_be_bytes());
            for dep in &step.depends_on {
                feed_str(&mut hasher, dep);
            }

            feed_json_map(&mut hasher, &step.resolved_properties);
            feed_json_map(&mut hasher, &step.outputs);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Feeds a length-prefixed string so adjacent fields cannot run together.
fn feed_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn feed_node(hasher: &mut Sha256, node: &ResourceNode) {
    feed_str(hasher, &node.id);
    feed_str(hasher, node.kind.as_str());

    hasher.update((node.properties.len() as u64).to_be_bytes());
    for (name, value) in &node.properties {
        feed_str(hasher, name);
        feed_value(hasher, value);
    }

    feed_json_map(hasher, &node.outputs);
}

fn feed_value(hasher: &mut Sha256, value: &PropertyValue) {
    match value {
        PropertyValue::Literal(literal) => {
            hasher.update([0u8]);
            feed_str(hasher, &literal.to_string());
        }
        PropertyValue::List(items) => {
            hasher.update([1u8]);
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                feed_value(hasher, item);
            }
        }
        PropertyValue::Map(entries) => {
            hasher.update([2u8]);
            hasher.update((entries.len() as u64).to_be_bytes());
            for (key, item) in entries {
                feed_str(hasher, key);
                feed_value(hasher, item);
            }
        }
        // A resolved reference hashes like the reference it came from.
        PropertyValue::Reference(reference)
        | PropertyValue::Resolved(crate::model::ResolvedRef { reference, .. }) => {
            hasher.update([3u8]);
            feed_str(hasher, &reference.target);
            feed_str(hasher, &reference.output);
        }
    }
}

fn feed_json_map(hasher: &mut Sha256, map: &BTreeMap<String, serde_json::Value>) {
    hasher.update((map.len() as u64).to_be_bytes());
    for (key, value) in map {
        feed_str(hasher, key);
        feed_str(hasher, &value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Reference, ResolvedRef, ResourceKind};
    use serde_json::json;

    fn declarations(order: &[&str]) -> Declarations {
        let mut declarations = Declarations::new();
        for id in order {
            let mut props = BTreeMap::new();
            props.insert(String::from("name"), PropertyValue::from(*id));
            declarations
                .declare_node(*id, ResourceKind::Bucket, props)
                .unwrap();
        }
        declarations
    }

    #[test]
    fn test_declaration_hash_ignores_order() {
        let hasher = DeclarationHasher::new();
        let a = hasher.hash_declarations(&declarations(&["raw", "curated", "logs"]));
        let b = hasher.hash_declarations(&declarations(&["logs", "raw", "curated"]));

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_different_declarations_different_hash() {
        let hasher = DeclarationHasher::new();
        let a = hasher.hash_declarations(&declarations(&["raw"]));
        let b = hasher.hash_declarations(&declarations(&["curated"]));

        assert_ne!(a, b);
    }

    #[test]
    fn test_resolved_hashes_like_reference() {
        let mut unresolved = Sha256::new();
        feed_value(&mut unresolved, &PropertyValue::reference("net", "vpcId"));

        let mut resolved = Sha256::new();
        feed_value(
            &mut resolved,
            &PropertyValue::Resolved(ResolvedRef {
                reference: Reference::new("net", "vpcId"),
                value: json!("vpc-1"),
            }),
        );

        assert_eq!(unresolved.finalize(), resolved.finalize());
    }

    #[test]
    fn test_short_hash() {
        let hasher = DeclarationHasher::new();
        let full_hash = "abcdef1234567890abcdef1234567890";
        let short = hasher.short_hash(full_hash);

        assert_eq!(short, "abcdef12");
        assert_eq!(short.len(), 8);
    }

    #[test]
    fn test_hashes_match() {
        assert!(DeclarationHasher::hashes_match("abc123", "abc123"));
        assert!(!DeclarationHasher::hashes_match("abc123", "abc124"));
        assert!(!DeclarationHasher::hashes_match("abc123", "abc12"));
    }
}
