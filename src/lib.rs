// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackplan
//!
//! A dependency-aware resource graph compiler for infrastructure stacks.
//!
//! ## Overview
//!
//! Stackplan takes declared infrastructure resources with cross-resource
//! references and turns them into a deterministic deployment plan:
//!
//! - Declare resources in a YAML stack file
//! - Reference another resource's outputs with `{ ref: { target, output } }`
//! - Catch unknown references and reference cycles before anything is applied
//! - Emit a fully resolved plan, ordered for apply and destroy
//!
//! ## Architecture
//!
//! Every planning pass is a strictly linear pipeline over an immutable
//! snapshot of declarations:
//!
//! 1. **Declared**: resources keyed by unique id
//! 2. **Resolved**: references bound to output values, edges derived
//! 3. **Built**: the dependency graph is assembled
//! 4. **Planned**: resources ordered in waves, cycles rejected
//! 5. **Emitted**: the final plan with every value substituted
//!
//! ## Modules
//!
//! - [`model`]: Resource kinds, nodes and property values
//! - [`graph`]: Reference resolution and graph assembly
//! - [`planner`]: Topological ordering and plan emission
//! - [`pipeline`]: The stage-by-stage planning pass
//! - [`config`]: Stack file parsing, validation and hashing
//! - [`artifact`]: Plan output storage
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: ml-pipeline
//!
//! resources:
//!   - id: network
//!     kind: network
//!     outputs:
//!       vpcId: vpc-0a1b2c
//!   - id: database
//!     kind: database
//!     properties:
//!       vpc: { ref: { target: network, output: vpcId } }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod planner;

// ============================================================================
// Re-exports
// ============================================================================

pub use artifact::{ArtifactStore, ArtifactWriter, LocalArtifactStore, SynthManifest};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, DeclarationHasher, StackConfig};
pub use error::{GraphError, Result, Stage, StackplanError};
pub use graph::{Edge, Graph, GraphBuilder, ReferenceResolver};
pub use model::{Declarations, KindRegistry, KindTable, PropertyValue, Reference, ResourceKind, ResourceNode};
pub use pipeline::{Pipeline, PipelineState, PlannedGraph};
pub use planner::{ExecutionOrder, Plan, PlanEmitter, PlanStep, TopologicalPlanner};
