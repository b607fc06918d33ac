//! Output directory locking.
//!
//! A synthesis run writes `output.lock` before touching the plan or the
//! manifest. The lock names the run and the plan it is writing, and
//! expires on its own so a crashed run never blocks the directory.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::planner::Plan;

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 120;

/// Contents of the output lock file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// The synthesis run holding the lock.
    pub holder: String,
    /// Project of the plan being written.
    pub project: String,
    /// Environment of the plan being written.
    pub environment: String,
    /// Fingerprint of the plan being written.
    pub fingerprint: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock request for writing `plan` on behalf of `holder`.
    #[must_use]
    pub fn for_plan(holder: &str, plan: &Plan) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            project: plan.project.clone(),
            environment: plan.environment.clone(),
            fingerprint: plan.fingerprint.clone(),
            acquired_at: now,
            expires_at: now + Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Seconds until expiry, never negative.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// True if this lock was taken to write exactly `plan`.
    #[must_use]
    pub fn is_writing(&self, plan: &Plan) -> bool {
        self.project == plan.project
            && self.environment == plan.environment
            && self.fingerprint == plan.fingerprint
    }
}

impl fmt::Display for LockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fingerprint = self.fingerprint.get(..12).unwrap_or(&self.fingerprint);
        write!(
            f,
            "{} writing {}/{} ({fingerprint})",
            self.holder, self.project, self.environment
        )
    }
}

/// Holder name for synthesis runs started by this process.
#[must_use]
pub fn generate_holder_id() -> String {
    let host = hostname::get().map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    format!("synth@{host}:{}", std::process::id())
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
    fn test_lock_records_plan() {
        let lock = LockInfo::for_plan("synth-1", &plan("0123456789abcdef"));

        assert!(!lock.is_expired());
        assert!(lock.remaining_secs() > 0);
        assert_eq!(lock.lock_id.len(), 36);
        assert!(lock.is_writing(&plan("0123456789abcdef")));
        assert!(!lock.is_writing(&plan("fedcba")));
        assert_eq!(lock.to_string(), "synth-1 writing ml-pipeline/dev (0123456789ab)");
    }

    #[test]
    fn test_expired_lock() {
        let mut lock = LockInfo::for_plan("synth-1", &plan("abc"));
        lock.expires_at = lock.acquired_at - Duration::seconds(1);

        assert!(lock.is_expired());
        assert_eq!(lock.remaining_secs(), 0);
    }

    #[test]
    fn test_lock_file_shape() {
        let lock = LockInfo::for_plan("synth-1", &plan("abc"));
        let json = serde_json::to_value(&lock).unwrap();

        assert_eq!(json["fingerprint"], "abc");
        assert!(json.get("lockId").is_some());
        assert!(json.get("expiresAt").is_some());
    }

    #[test]
    fn test_holder_id_names_process() {
        let holder = generate_holder_id();

        assert!(holder.starts_with("synth@"));
        assert!(holder.ends_with(&format!(":{}", std::process::id())));
    }
}
