//! Artifact storage for synthesized plans.
//!
//! This module writes emitted plans to an output directory together with a
//! manifest recording their source hash, fingerprint and synthesis history.

mod store;
mod local;
mod lock;
mod types;
mod writer;

pub use store::ArtifactStore;
pub use local::LocalArtifactStore;
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
pub use types::{SynthHistoryEntry, SynthManifest, SynthOperation, MANIFEST_VERSION};
pub use writer::{ArtifactWriter, SynthOutcome};
