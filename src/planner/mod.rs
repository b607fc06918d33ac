//! Planning module for resource graphs.
//!
//! This module orders a validated graph for apply and destroy, detects
//! reference cycles, and emits the final deployment plan.

mod order;
mod plan;

pub use order::{ExecutionOrder, TopologicalPlanner};
pub use plan::{Plan, PlanEmitter, PlanStep};
