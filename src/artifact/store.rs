//! Artifact store trait definition.
//!
//! This module defines the common interface for plan output backends.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::PlanFormat;
use crate::error::Result;
use crate::planner::Plan;
use super::lock::LockInfo;
use super::types::SynthManifest;

/// Trait for plan output backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Loads the manifest of the last synthesis.
    ///
    /// Returns `None` if nothing has been synthesized yet.
    async fn load_manifest(&self) -> Result<Option<SynthManifest>>;

    /// Saves the manifest.
    async fn save_manifest(&self, manifest: &SynthManifest) -> Result<()>;

    /// Writes a plan in the given format and returns where it went.
    async fn write_plan(&self, plan: &Plan, format: PlanFormat) -> Result<PathBuf>;

    /// Deletes every artifact, lock included.
    async fn delete(&self) -> Result<()>;

    /// Checks if a manifest exists.
    async fn exists(&self) -> Result<bool>;

    /// Acquires the output lock described by `request`.
    ///
    /// Fails if another run holds a lock that has not expired.
    async fn acquire_lock(&self, request: LockInfo) -> Result<LockInfo>;

    /// Releases a lock on the output.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Gets current lock information if locked.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Checks if the output is locked.
    async fn is_locked(&self) -> Result<bool>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl ArtifactStore for Box<dyn ArtifactStore> {
    async fn load_manifest(&self) -> Result<Option<SynthManifest>> {
        (**self).load_manifest().await
    }

    async fn save_manifest(&self, manifest: &SynthManifest) -> Result<()> {
        (**self).save_manifest(manifest).await
    }

    async fn write_plan(&self, plan: &Plan, format: PlanFormat) -> Result<PathBuf> {
        (**self).write_plan(plan, format).await
    }

    async fn delete(&self) -> Result<()> {
        (**self).delete().await
    }

    async fn exists(&self) -> Result<bool> {
        (**self).exists().await
    }

    async fn acquire_lock(&self, request: LockInfo) -> Result<LockInfo> {
        (**self).acquire_lock(request).await
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        (**self).release_lock(lock_id).await
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        (**self).get_lock_info().await
    }

    async fn is_locked(&self) -> Result<bool> {
        (**self).is_locked().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
