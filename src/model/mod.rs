//! Resource node model.
//!
//! This module defines what a declared resource looks like before any
//! reference has been resolved:
//! - Resource kinds and the registry of outputs each kind produces
//! - Property values, which may hold symbolic references
//! - Resource nodes and the declaration set

mod kind;
mod node;
mod value;

pub use kind::{ALL_KINDS, KindRegistry, KindTable, OutputSet, ResourceKind};
pub use node::{Declarations, ResourceNode};
pub use value::{PropertyValue, Reference, ResolvedRef};
