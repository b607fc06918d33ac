//! Resource graph construction.
//!
//! Resolution turns symbolic references into resolved values and derived
//! edges; the builder assembles those into a frozen [`Graph`]. The graph is
//! rebuilt from scratch on every planning pass.

mod builder;
mod resolver;

pub use builder::{Edge, Graph, GraphBuilder};
pub use resolver::{ReferenceResolver, Resolution};
