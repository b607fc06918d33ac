//! Local directory artifact backend.
//!
//! Writes plans and the manifest into a directory on disk, replacing files
//! atomically so a reader never sees a half-written plan.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::PlanFormat;
use crate::error::{ArtifactError, Result, StackplanError};
use crate::planner::Plan;

use super::lock::{LockInfo, LOCK_EXPIRY_SECS};
use super::store::ArtifactStore;
use super::types::SynthManifest;

/// Manifest file name.
const MANIFEST_FILE: &str = "manifest.json";

/// Lock file name.
const LOCK_FILE: &str = "output.lock";

/// Plan file stem; the extension follows the format.
const PLAN_STEM: &str = "plan";

/// Local directory artifact store.
#[derive(Debug)]
pub struct LocalArtifactStore {
    /// Output directory.
    base_dir: PathBuf,
    /// Path to the manifest.
    manifest_path: PathBuf,
    /// Path to the lock file.
    lock_path: PathBuf,
}

impl LocalArtifactStore {
    /// Creates a store writing into `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let manifest_path = base_dir.join(MANIFEST_FILE);
        let lock_path = base_dir.join(LOCK_FILE);

        Self {
            base_dir,
            manifest_path,
            lock_path,
        }
    }

    /// The output directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the plan file for a format.
    #[must_use]
    pub fn plan_path(&self, format: PlanFormat) -> PathBuf {
        self.base_dir
            .join(format!("{PLAN_STEM}.{}", format.extension()))
    }

    /// Ensures the output directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating output directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir).await.map_err(|e| {
                ArtifactError::write(format!("Failed to create output directory: {e}"))
            })?;
        }
        Ok(())
    }

    /// Writes `content` to a temporary file, then renames it over `path`.
    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        self.ensure_dir().await?;

        let temp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            ArtifactError::write(format!("Failed to create {}: {e}", temp_path.display()))
        })?;

        file.write_all(content.as_bytes()).await.map_err(|e| {
            ArtifactError::write(format!("Failed to write {}: {e}", temp_path.display()))
        })?;

        file.sync_all().await.map_err(|e| {
            ArtifactError::write(format!("Failed to sync {}: {e}", temp_path.display()))
        })?;

        fs::rename(&temp_path, path).await.map_err(|e| {
            ArtifactError::write(format!("Failed to rename into {}: {e}", path.display()))
        })?;

        Ok(())
    }

    /// Removes a file if present.
    async fn remove_if_exists(path: &Path) -> Result<()> {
        if path.exists() {
            debug!("Removing {}", path.display());
            fs::remove_file(path).await.map_err(|e| {
                ArtifactError::write(format!("Failed to delete {}: {e}", path.display()))
            })?;
        }
        Ok(())
    }

    /// Reads the lock file if it exists.
    async fn read_lock_file(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path).await.map_err(|e| {
            StackplanError::Artifact(ArtifactError::Corrupted {
                message: format!("Failed to read lock file: {e}"),
            })
        })?;

        let lock_info: LockInfo = serde_json::from_str(&content).map_err(|e| {
            StackplanError::Artifact(ArtifactError::Corrupted {
                message: format!("Failed to parse lock file: {e}"),
            })
        })?;

        Ok(Some(lock_info))
    }

    /// Writes the lock file.
    async fn write_lock_file(&self, lock_info: &LockInfo) -> Result<()> {
        let content = serde_json::to_string_pretty(lock_info)
            .map_err(|e| ArtifactError::serialization(format!("Failed to serialize lock: {e}")))?;

        self.write_atomic(&self.lock_path, &content)
            .await
            .map_err(|e| {
                StackplanError::Artifact(ArtifactError::LockFailed {
                    message: e.to_string(),
                })
            })
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn load_manifest(&self) -> Result<Option<SynthManifest>> {
        if !self.manifest_path.exists() {
            debug!("Manifest does not exist: {}", self.manifest_path.display());
            return Ok(None);
        }

        info!("Loading manifest from: {}", self.manifest_path.display());

        let content = fs::read_to_string(&self.manifest_path).await.map_err(|e| {
            StackplanError::Artifact(ArtifactError::Corrupted {
                message: format!("Failed to read manifest: {e}"),
            })
        })?;

        let manifest: SynthManifest = serde_json::from_str(&content).map_err(|e| {
            StackplanError::Artifact(ArtifactError::Corrupted {
                message: format!("Failed to parse manifest: {e}"),
            })
        })?;

        Ok(Some(manifest))
    }

    async fn save_manifest(&self, manifest: &SynthManifest) -> Result<()> {
        let content = serde_json::to_string_pretty(manifest).map_err(|e| {
            ArtifactError::serialization(format!("Failed to serialize manifest: {e}"))
        })?;

        self.write_atomic(&self.manifest_path, &content).await?;
        debug!("Manifest saved to {}", self.manifest_path.display());
        Ok(())
    }

    async fn write_plan(&self, plan: &Plan, format: PlanFormat) -> Result<PathBuf> {
        let content = match format {
            PlanFormat::Json => plan.to_json()?,
            PlanFormat::Yaml => plan.to_yaml()?,
        };

        let path = self.plan_path(format);
        info!("Writing plan to: {}", path.display());
        self.write_atomic(&path, &content).await?;

        // Only one plan lives in the directory at a time.
        for other in [PlanFormat::Json, PlanFormat::Yaml] {
            if other != format {
                Self::remove_if_exists(&self.plan_path(other)).await?;
            }
        }

        Ok(path)
    }

    async fn delete(&self) -> Result<()> {
        info!("Cleaning artifacts in: {}", self.base_dir.display());

        Self::remove_if_exists(&self.plan_path(PlanFormat::Json)).await?;
        Self::remove_if_exists(&self.plan_path(PlanFormat::Yaml)).await?;
        Self::remove_if_exists(&self.manifest_path).await?;
        Self::remove_if_exists(&self.lock_path).await?;

        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.manifest_path.exists())
    }

    async fn acquire_lock(&self, request: LockInfo) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock_file().await? {
            if !existing.is_expired() {
                return Err(StackplanError::Artifact(ArtifactError::LockedByOther {
                    holder: existing.to_string(),
                    since: existing.acquired_at.to_rfc3339(),
                }));
            }
            debug!("Expired lock of {existing} found, taking over");
        }

        self.write_lock_file(&request).await?;

        info!(
            "Acquired output lock {} for {}/{} (expires in {}s)",
            request.lock_id, request.project, request.environment, LOCK_EXPIRY_SECS
        );

        Ok(request)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        if let Some(existing) = self.read_lock_file().await? {
            if existing.lock_id == lock_id {
                Self::remove_if_exists(&self.lock_path).await?;
                info!("Released output lock: {lock_id}");
            } else {
                debug!(
                    "Lock ID mismatch: expected {lock_id}, found {}",
                    existing.lock_id
                );
            }
        }
        Ok(())
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock_file().await
    }

    async fn is_locked(&self) -> Result<bool> {
        if let Some(lock_info) = self.read_lock_file().await? {
            return Ok(!lock_info.is_expired());
        }
        Ok(false)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
