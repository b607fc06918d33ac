//! Property values and symbolic references.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Symbolic pointer to another resource's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    /// Id of the referenced resource.
    pub target: String,
    /// Output name on the referenced resource.
    pub output: String,
}

impl Reference {
    /// Creates a new reference.
    #[must_use]
    pub fn new(target: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            output: output.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.output)
    }
}

/// A reference after resolution, keeping where the value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// The original reference.
    pub reference: Reference,
    /// The output value it resolved to.
    pub value: serde_json::Value,
}

/// `{ ref: { target, output } }` as written in stack files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
struct RefEnvelope {
    #[serde(rename = "ref")]
    reference: Reference,
}

/// Value of a declared property.
///
/// The stack-file form is untagged: `{ ref: ... }` is a reference, a
/// sequence is a list, a mapping is a map, and anything else is a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// A scalar literal (null, bool, number, string).
    Literal(serde_json::Value),
    /// A list of values.
    List(Vec<PropertyValue>),
    /// A map of values.
    Map(BTreeMap<String, PropertyValue>),
    /// An unresolved reference.
    Reference(Reference),
    /// A reference that has been bound to its output value.
    Resolved(ResolvedRef),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Reference(RefEnvelope),
    List(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Literal(serde_json::Value),
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match RawValue::deserialize(deserializer)? {
            RawValue::Reference(envelope) => Self::Reference(envelope.reference),
            RawValue::List(items) => Self::List(items),
            RawValue::Map(entries) => Self::Map(entries),
            RawValue::Literal(value) => Self::Literal(value),
        })
    }
}

impl Serialize for PropertyValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Literal(value) => value.serialize(serializer),
            Self::List(items) => items.serialize(serializer),
            Self::Map(entries) => entries.serialize(serializer),
            Self::Reference(reference) => RefEnvelope {
                reference: reference.clone(),
            }
            .serialize(serializer),
            Self::Resolved(resolved) => resolved.value.serialize(serializer),
        }
    }
}

impl PropertyValue {
    /// Shorthand for a reference value.
    #[must_use]
    pub fn reference(target: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Reference(Reference::new(target, output))
    }

    /// Collects every reference in this value, with its property path.
    ///
    /// Resolved references are included so edges can be derived from an
    /// already-resolved node as well.
    pub fn collect_references<'a>(&'a self, path: &str, out: &mut Vec<(String, &'a Reference)>) {
        match self {
            Self::Literal(_) => {}
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    item.collect_references(&format!("{path}[{i}]"), out);
                }
            }
            Self::Map(entries) => {
                for (key, item) in entries {
                    item.collect_references(&format!("{path}.{key}"), out);
                }
            }
            Self::Reference(reference) => out.push((path.to_string(), reference)),
            Self::Resolved(resolved) => out.push((path.to_string(), &resolved.reference)),
        }
    }

    /// Returns the path of the first unresolved reference, if any.
    #[must_use]
    pub fn first_unresolved(&self, path: &str) -> Option<String> {
        match self {
            Self::Literal(_) | Self::Resolved(_) => None,
            Self::Reference(_) => Some(path.to_string()),
            Self::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(i, item)| item.first_unresolved(&format!("{path}[{i}]"))),
            Self::Map(entries) => entries
                .iter()
                .find_map(|(key, item)| item.first_unresolved(&format!("{path}.{key}"))),
        }
    }

    /// Converts to a plain JSON value, or `None` if a reference is unresolved.
    #[must_use]
    pub fn to_resolved_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::Resolved(resolved) => Some(resolved.value.clone()),
            Self::Reference(_) => None,
            Self::List(items) => items
                .iter()
                .map(Self::to_resolved_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Self::Map(entries) => entries
                .iter()
                .map(|(key, item)| item.to_resolved_json().map(|v| (key.clone(), v)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
        }
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(entries) => {
                Self::Map(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
            scalar => Self::Literal(scalar),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Literal(serde_json::Value::String(value.to_string()))
    }
}

impl From<Reference> for PropertyValue {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}
