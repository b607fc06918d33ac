//! Synthesis manifest types.
//!
//! The manifest sits next to the written plan and records what was
//! synthesized, from which declarations, and a short history of runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DeclarationHasher, PlanFormat};
use crate::planner::Plan;

/// Current version of the manifest format.
pub const MANIFEST_VERSION: &str = "1.0";

/// Maximum number of history entries kept.
const MAX_HISTORY: usize = 50;

/// Record of the plan currently in an output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthManifest {
    /// Manifest format version.
    pub version: String,
    /// Project name.
    pub project: String,
    /// Environment name.
    pub environment: String,
    /// Source hash of the declarations behind the current plan.
    pub source_hash: String,
    /// Fingerprint of the current plan.
    pub plan_fingerprint: String,
    /// Format of the written plan.
    pub format: PlanFormat,
    /// File name of the written plan.
    pub plan_file: String,
    /// Number of resources in the plan.
    pub resource_count: usize,
    /// When the plan was last written.
    pub synthesized_at: DateTime<Utc>,
    /// Recent synthesis runs, oldest first.
    #[serde(default)]
    pub history: Vec<SynthHistoryEntry>,
}

/// A single synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthHistoryEntry {
    /// When the run happened.
    pub timestamp: DateTime<Utc>,
    /// What the run did.
    pub operation: SynthOperation,
    /// Source hash at the time.
    pub source_hash: String,
    /// Plan fingerprint at the time.
    pub plan_fingerprint: String,
    /// Number of resources planned.
    pub resource_count: usize,
}

/// Outcome of a synthesis run relative to the previous one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SynthOperation {
    /// First plan written to the directory.
    Create,
    /// The plan changed.
    Update,
    /// The plan is identical to the previous one.
    Unchanged,
}

impl SynthManifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new(project: &str, environment: &str) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            project: project.to_string(),
            environment: environment.to_string(),
            source_hash: String::new(),
            plan_fingerprint: String::new(),
            format: PlanFormat::default(),
            plan_file: String::new(),
            resource_count: 0,
            synthesized_at: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Returns true if the manifest describes exactly this plan.
    #[must_use]
    pub fn is_current(&self, plan: &Plan) -> bool {
        !self.plan_fingerprint.is_empty()
            && DeclarationHasher::hashes_match(&self.plan_fingerprint, &plan.fingerprint)
    }

    /// Records a written plan and returns what changed.
    pub fn record(&mut self, plan: &Plan, format: PlanFormat, plan_file: &str) -> SynthOperation {
        let operation = if self.plan_fingerprint.is_empty() {
            SynthOperation::Create
        } else if self.is_current(plan) && self.format == format {
            SynthOperation::Unchanged
        } else {
            SynthOperation::Update
        };

        self.project.clone_from(&plan.project);
        self.environment.clone_from(&plan.environment);
        self.source_hash.clone_from(&plan.source_hash);
        self.plan_fingerprint.clone_from(&plan.fingerprint);
        self.format = format;
        self.plan_file = plan_file.to_string();
        self.resource_count = plan.len();
        self.synthesized_at = Utc::now();

        self.add_history(SynthHistoryEntry {
            timestamp: self.synthesized_at,
            operation,
            source_hash: plan.source_hash.clone(),
            plan_fingerprint: plan.fingerprint.clone(),
            resource_count: plan.len(),
        });

        operation
    }

    /// Adds a history entry.
    pub fn add_history(&mut self, entry: SynthHistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }

    /// Returns the most recent history entry.
    #[must_use]
    pub fn last_run(&self) -> Option<&SynthHistoryEntry> {
        self.history.last()
    }
}

impl std::fmt::Display for SynthOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
        };
        write!(f, "{op}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(fingerprint: &str) -> Plan {
        Plan {
            project: String::from("ml-pipeline"),
            environment: String::from("dev"),
            source_hash: String::from("src"),
            fingerprint: fingerprint.to_string(),
            steps: Vec::new(),
        }
    }

    #[test]
    fn test_record_operations() {
        let mut manifest = SynthManifest::new("ml-pipeline", "dev");

        assert_eq!(manifest.record(&plan("aa"), PlanFormat::Json, "plan.json"), SynthOperation::Create);
        assert_eq!(manifest.record(&plan("aa"), PlanFormat::Json, "plan.json"), SynthOperation::Unchanged);
        assert_eq!(manifest.record(&plan("bb"), PlanFormat::Json, "plan.json"), SynthOperation::Update);
        assert_eq!(manifest.record(&plan("bb"), PlanFormat::Yaml, "plan.yaml"), SynthOperation::Update);

        assert_eq!(manifest.history.len(), 4);
        assert_eq!(manifest.plan_file, "plan.yaml");
        assert!(manifest.is_current(&plan("bb")));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut manifest = SynthManifest::new("p", "dev");
        for i in 0..(MAX_HISTORY + 5) {
            manifest.record(&plan(&format!("{i:02}")), PlanFormat::Json, "plan.json");
        }

        assert_eq!(manifest.history.len(), MAX_HISTORY);
        assert_eq!(
            manifest.last_run().map(|e| e.plan_fingerprint.as_str()),
            Some(format!("{:02}", MAX_HISTORY + 4).as_str())
        );
    }
}
