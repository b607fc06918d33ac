//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::artifact::{LockInfo, SynthManifest, SynthOperation, SynthOutcome};
use crate::config::{StackConfig, ValidationResult};
use crate::error::StackplanError;
use crate::graph::Graph;
use crate::planner::{ExecutionOrder, Plan, PlanStep};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan step row for table display.
#[derive(Tabled)]
struct PlanStepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Wave")]
    wave: usize,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Depends on")]
    depends_on: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan in apply order.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan, detailed: bool) -> String {
        match self.format {
            OutputFormat::Json => plan.to_json().unwrap_or_default(),
            OutputFormat::Text => Self::format_steps_text(plan, plan.apply_steps(), "Apply", detailed),
        }
    }

    /// Formats a plan in destroy order.
    #[must_use]
    pub fn format_destroy(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => {
                let order: Vec<&str> = plan.destroy_steps().map(|s| s.id.as_str()).collect();
                let json = serde_json::json!({
                    "project": plan.project,
                    "environment": plan.environment,
                    "fingerprint": plan.fingerprint,
                    "destroyOrder": order,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_steps_text(plan, plan.destroy_steps(), "Destroy", false),
        }
    }

    fn format_steps_text<'a>(
        plan: &Plan,
        steps: impl Iterator<Item = &'a PlanStep>,
        title: &str,
        detailed: bool,
    ) -> String {
        if plan.is_empty() {
            return format!("{} Nothing to deploy - no resources declared.\n", "✓".green());
        }

        let mut output = String::new();

        let _ = writeln!(
            output,
            "\n{} Plan for {}/{}",
            title.bold(),
            plan.project,
            plan.environment
        );
        let _ = write!(
            output,
            "   Fingerprint: {}  Source: {}\n\n",
            short(&plan.fingerprint),
            short(&plan.source_hash)
        );

        let steps: Vec<&PlanStep> = steps.collect();
        let rows: Vec<PlanStepRow> = steps
            .iter()
            .enumerate()
            .map(|(i, s)| PlanStepRow {
                index: i + 1,
                wave: s.wave,
                resource: s.id.clone(),
                kind: s.kind.to_string(),
                depends_on: Self::truncate(&s.depends_on.join(", "), 40),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if detailed {
            output.push_str("\nResolved properties:\n");
            for step in &steps {
                let _ = writeln!(output, "   {}", step.id.cyan());
                if step.resolved_properties.is_empty() {
                    let _ = writeln!(output, "     {}", "(none)".dimmed());
                }
                for (name, value) in &step.resolved_properties {
                    let _ = writeln!(output, "     {name} = {value}");
                }
            }
        }

        let kinds = plan
            .kind_counts()
            .iter()
            .map(|(kind, count)| format!("{count} {kind}"))
            .collect::<Vec<_>>()
            .join(", ");

        let _ = write!(
            output,
            "\nPlan: {} resources in {} waves ({kinds})\n",
            plan.len().to_string().green(),
            plan.wave_count().to_string().yellow()
        );

        output
    }

    /// Formats a validation result.
    ///
    /// `summary` is present once the stack has also been ordered.
    #[must_use]
    pub fn format_validation(
        &self,
        result: &ValidationResult,
        show_warnings: bool,
        summary: Option<(&StackConfig, &ExecutionOrder)>,
    ) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": result.warnings,
                    "resources": summary.map(|(_, order)| order.len()),
                    "waves": summary.map(|(_, order)| order.waves().len()),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Stack is valid!\n", "✓".green())
                } else {
                    let mut output = format!("{} Stack has {} error(s):\n", "✗".red(), result.error_count());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                if let Some((config, order)) = summary {
                    output.push_str("\nStack summary:\n");
                    let _ = writeln!(output, "   Project: {}", config.project.name);
                    let _ = writeln!(output, "   Environment: {}", config.project.environment);
                    let _ = writeln!(output, "   Resources: {}", order.len());
                    let _ = writeln!(output, "   Waves: {}", order.waves().len());
                }

                output
            }
        }
    }

    /// Formats a synthesis outcome.
    #[must_use]
    pub fn format_synth(&self, outcome: &SynthOutcome) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "operation": outcome.operation,
                    "planPath": outcome.plan_path.display().to_string(),
                    "fingerprint": outcome.manifest.plan_fingerprint,
                    "resources": outcome.manifest.resource_count,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let operation = match outcome.operation {
                    SynthOperation::Create => "created".green().to_string(),
                    SynthOperation::Update => "updated".yellow().to_string(),
                    SynthOperation::Unchanged => "unchanged".dimmed().to_string(),
                };
                format!(
                    "{} Plan {operation}: {} ({} resources, {})\n",
                    "✓".green(),
                    outcome.plan_path.display(),
                    outcome.manifest.resource_count,
                    short(&outcome.manifest.plan_fingerprint)
                )
            }
        }
    }

    /// Formats a synthesis manifest.
    #[must_use]
    pub fn format_manifest(&self, manifest: &SynthManifest, lock: Option<&LockInfo>) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "manifest": manifest,
                    "lock": lock,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(
                    output,
                    "\nArtifacts: {}/{}\n\n",
                    manifest.project,
                    manifest.environment
                );

                let _ = writeln!(output, "   Version: {}", manifest.version);
                let _ = writeln!(output, "   Plan file: {}", manifest.plan_file);
                let _ = writeln!(output, "   Resources: {}", manifest.resource_count);
                let _ = writeln!(output, "   Source hash: {}", short(&manifest.source_hash));
                let _ = writeln!(output, "   Fingerprint: {}", short(&manifest.plan_fingerprint));
                let _ = writeln!(output, "   Synthesized: {}", manifest.synthesized_at);

                match lock {
                    Some(lock) if !lock.is_expired() => {
                        let _ = writeln!(
                            output,
                            "   Lock: {} held by {lock} ({}s left)",
                            lock.lock_id.yellow(),
                            lock.remaining_secs()
                        );
                    }
                    _ => {
                        let _ = writeln!(output, "   Lock: {}", "none".dimmed());
                    }
                }

                if !manifest.history.is_empty() {
                    let _ = writeln!(output, "\n   Recent history ({}):", manifest.history.len());
                    for entry in manifest.history.iter().rev().take(5) {
                        let _ = writeln!(
                            output,
                            "     {} - {} ({} resources, {})",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.operation,
                            entry.resource_count,
                            short(&entry.plan_fingerprint)
                        );
                    }
                }

                output
            }
        }
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Nodes sharing a wave are placed on the same rank. Edges point from a
    /// resource to the resources that depend on it.
    #[must_use]
    pub fn format_graph_dot(&self, graph: &Graph, order: &ExecutionOrder) -> String {
        let mut output = String::from("digraph stack {\n    rankdir=LR;\n    node [shape=box];\n");

        for node in graph.nodes() {
            let _ = writeln!(
                output,
                "    \"{}\" [label=\"{}\\n({})\"];",
                escape_dot(&node.id),
                escape_dot(&node.id),
                node.kind
            );
        }

        for (wave, ids) in order.waves().iter().enumerate() {
            let members = ids
                .iter()
                .map(|id| format!("\"{}\"", escape_dot(id)))
                .collect::<Vec<_>>()
                .join("; ");
            let _ = writeln!(output, "    {{ rank=same; {members}; }} // wave {wave}");
        }

        for edge in graph.edges() {
            let _ = writeln!(
                output,
                "    \"{}\" -> \"{}\";",
                escape_dot(&edge.from),
                escape_dot(&edge.to)
            );
        }

        output.push_str("}\n");
        output
    }

    /// Formats an error, with stage and resource ids for graph errors.
    #[must_use]
    pub fn format_error(&self, error: &StackplanError) -> String {
        let graph_error = match error {
            StackplanError::Graph(e) => Some(e),
            _ => None,
        };

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "status": "error",
                    "message": error.to_string(),
                    "stage": graph_error.map(|e| e.stage().to_string()),
                    "kind": graph_error.map(|e| e.kind_name()),
                    "resources": graph_error.map(|e| e.node_ids()),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} {error}", "✗".red());
                if let Some(e) = graph_error {
                    let _ = write!(
                        output,
                        "\n   stage: {}, kind: {}, resources: {}",
                        e.stage(),
                        e.kind_name(),
                        e.node_ids().join(", ")
                    );
                }
                output
            }
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{kept}...")
        }
    }
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
