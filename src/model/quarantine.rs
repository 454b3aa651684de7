//! Quarantine record model (C7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    Active,
    Released,
    Expired,
    Reviewed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineRecord {
    pub document_id: String,
    pub policy_id: String,
    pub reason: String,
    pub quarantined_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: QuarantineStatus,
    pub reviewer_id: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

impl QuarantineRecord {
    pub fn new(
        document_id: impl Into<String>,
        policy_id: impl Into<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            policy_id: policy_id.into(),
            reason: reason.into(),
            quarantined_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_seconds as i64),
            status: QuarantineStatus::Active,
            reviewer_id: None,
            reviewed_at: None,
            review_notes: None,
        }
    }

    /// Whether this record currently blocks admission: active and not yet
    /// past its expiry at `now`.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        self.status == QuarantineStatus::Active && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_before_expiry() {
        let now = Utc::now();
        let record = QuarantineRecord::new("doc-1", "default", "missing_signature", now, 3600);
        assert!(record.is_blocking(now));
    }

    #[test]
    fn test_not_blocking_after_expiry() {
        let now = Utc::now();
        let record = QuarantineRecord::new("doc-1", "default", "missing_signature", now, 3600);
        let later = now + chrono::Duration::seconds(3601);
        assert!(!record.is_blocking(later));
    }

    #[test]
    fn test_not_blocking_when_released() {
        let now = Utc::now();
        let mut record = QuarantineRecord::new("doc-1", "default", "missing_signature", now, 3600);
        record.status = QuarantineStatus::Released;
        assert!(!record.is_blocking(now));
    }
}
