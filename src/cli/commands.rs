//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PlanFormat;

/// Stackplan - dependency-aware resource graph compiler.
#[derive(Parser, Debug)]
#[command(name = "stackplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the stack file.
    #[arg(short, long, global = true, env = "STACKPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new stack.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the stack file and its resource graph.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Compute and display the deployment plan.
    Plan {
        /// Show the destroy order instead of the apply order.
        #[arg(long)]
        destroy: bool,

        /// Show resolved properties for every step.
        #[arg(short, long)]
        detailed: bool,
    },

    /// Write the plan to the output directory.
    Synth {
        /// Output directory (overrides the stack file).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Plan format (overrides the stack file).
        #[arg(long)]
        format: Option<SynthFormat>,
    },

    /// Print the resource graph in Graphviz DOT format.
    Graph,

    /// Manage synthesized artifacts.
    Artifacts {
        /// Artifacts subcommand.
        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

/// Artifact management subcommands.
#[derive(Subcommand, Debug)]
pub enum ArtifactCommands {
    /// Show the manifest of the last synthesis.
    Show,

    /// Unlock the output directory.
    Unlock {
        /// Lock ID to unlock.
        #[arg(long)]
        lock_id: Option<String>,

        /// Force unlock (dangerous).
        #[arg(long)]
        force: bool,
    },

    /// Delete the plan, manifest and lock.
    Clean,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Plan file formats accepted on the command line.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SynthFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

impl From<SynthFormat> for PlanFormat {
    fn from(format: SynthFormat) -> Self {
        match format {
            SynthFormat::Json => Self::Json,
            SynthFormat::Yaml => Self::Yaml,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_synth() {
        let cli = Cli::try_parse_from([
            "stackplan", "--config", "infra/stack.yaml", "synth", "--format", "yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("infra/stack.yaml")));
        match cli.command {
            Commands::Synth { out, format } => {
                assert!(out.is_none());
                assert_eq!(format.map(PlanFormat::from), Some(PlanFormat::Yaml));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_artifacts_unlock() {
        let cli = Cli::try_parse_from(["stackplan", "artifacts", "unlock", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Artifacts {
                command: ArtifactCommands::Unlock { lock_id: None, force: true }
            }
        ));
    }
}
