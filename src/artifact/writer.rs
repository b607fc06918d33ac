//! Plan synthesis into an artifact store.
//!
//! Takes the output lock, writes the plan, updates the manifest, and
//! releases the lock whether or not the write succeeded.

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::PlanFormat;
use crate::error::Result;
use crate::planner::Plan;

use super::lock::{generate_holder_id, LockInfo};
use super::store::ArtifactStore;
use super::types::{SynthManifest, SynthOperation};

/// Writer that synthesizes plans into a store.
pub struct ArtifactWriter<'a, S: ArtifactStore + ?Sized> {
    /// Target store.
    store: &'a S,
    /// Lock holder identity.
    holder: String,
}

/// Result of a synthesis.
#[derive(Debug, Clone)]
pub struct SynthOutcome {
    /// What changed relative to the previous synthesis.
    pub operation: SynthOperation,
    /// Where the plan was written.
    pub plan_path: PathBuf,
    /// The updated manifest.
    pub manifest: SynthManifest,
}

impl<'a, S: ArtifactStore + ?Sized> ArtifactWriter<'a, S> {
    /// Creates a writer for `store`.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            holder: generate_holder_id(),
        }
    }

    /// Sets the lock holder identity.
    #[must_use]
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Writes `plan` and records it in the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the output is locked by someone else or any
    /// write fails.
    pub async fn synthesize(&self, plan: &Plan, format: PlanFormat) -> Result<SynthOutcome> {
        let lock = self
            .store
            .acquire_lock(LockInfo::for_plan(&self.holder, plan))
            .await?;
        debug!("Holding output lock {}: {lock}", lock.lock_id);

        let result = self.write_locked(plan, format).await;

        if let Err(e) = self.store.release_lock(&lock.lock_id).await {
            warn!("Failed to release output lock {}: {e}", lock.lock_id);
        }

        result
    }

    async fn write_locked(&self, plan: &Plan, format: PlanFormat) -> Result<SynthOutcome> {
        let mut manifest = self
            .store
            .load_manifest()
            .await?
            .unwrap_or_else(|| SynthManifest::new(&plan.project, &plan.environment));

        let plan_path = self.store.write_plan(plan, format).await?;
        let plan_file = plan_path
            .file_name()
            .map_or_else(String::new, |f| f.to_string_lossy().to_string());

        let operation = manifest.record(plan, format, &plan_file);
        self.store.save_manifest(&manifest).await?;

        info!(
            "Synthesized {} resources to {} ({operation})",
            plan.len(),
            plan_path.display()
        );

        Ok(SynthOutcome {
            operation,
            plan_path,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::LocalArtifactStore;
    use crate::error::{ArtifactError, StackplanError};
    use crate::pipeline::Pipeline;
    use crate::config::ConfigParser;
    use tempfile::TempDir;

    const STACK: &str = r"
project:
  name: ml-pipeline
resources:
  - id: network
    kind: network
    outputs:
      vpcId: vpc-0a1b2c
  - id: database
    kind: database
    properties:
      vpc: { ref: { target: network, output: vpcId } }
";

    fn plan() -> Plan {
        let config = ConfigParser::new().parse_yaml(STACK, None).unwrap();
        Pipeline::from_config(&config).run_config(&config).unwrap()
    }

    #[tokio::test]
    async fn test_synthesize_twice_is_unchanged() {
        let temp = TempDir::new().unwrap();
        let store = LocalArtifactStore::with_base_dir(temp.path());
        let writer = ArtifactWriter::new(&store);
        let plan = plan();

        let first = writer.synthesize(&plan, PlanFormat::Json).await.unwrap();
        let bytes = std::fs::read(&first.plan_path).unwrap();
        let second = writer.synthesize(&plan, PlanFormat::Json).await.unwrap();

        assert_eq!(first.operation, SynthOperation::Create);
        assert_eq!(second.operation, SynthOperation::Unchanged);
        assert_eq!(bytes, std::fs::read(&second.plan_path).unwrap());
        assert_eq!(second.manifest.history.len(), 2);
        assert!(!store.is_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_synthesize_respects_foreign_lock() {
        let temp = TempDir::new().unwrap();
        let store = LocalArtifactStore::with_base_dir(temp.path());
        store
            .acquire_lock(LockInfo::for_plan("someone-else", &plan()))
            .await
            .unwrap();

        let err = ArtifactWriter::new(&store)
            .with_holder("me")
            .synthesize(&plan(), PlanFormat::Yaml)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StackplanError::Artifact(ArtifactError::LockedByOther { .. })
        ));
        assert!(!store.exists().await.unwrap());
    }
}
