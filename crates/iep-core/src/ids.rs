use serde::{Deserialize, Serialize};

/// A processing unit's composite key, plus the owning user and source blob
/// locator. Carried end-to-end through the orchestrator so every step can
/// check ownership (invariant I5) without a re-fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKey {
    pub iep_id: String,
    pub child_id: String,
    pub user_id: String,
}

impl DocumentKey {
    pub fn new(iep_id: impl Into<String>, child_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            iep_id: iep_id.into(),
            child_id: child_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Matches invariant I5: a write may only proceed if the execution's
    /// owner matches the record's owner.
    pub fn owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// A source blob locator: `(bucket, key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLocator {
    pub bucket: String,
    pub key: String,
}

impl BlobLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// A stable locator string suitable for storing in `documentUrl`.
    pub fn as_locator_string(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}
