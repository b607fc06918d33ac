//! CLI module for the stackplan tool.
//!
//! This module provides the command-line interface for validating,
//! planning and synthesizing resource stacks.

mod commands;
mod output;

pub use commands::{ArtifactCommands, Cli, Commands, OutputFormat, SynthFormat};
pub use output::OutputFormatter;
