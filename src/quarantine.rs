//! Quarantine enforcement (C7).
//!
//! A plain `HashMap` behind one `parking_lot::RwLock`, the same ownership
//! style as the policy store (C3) — the quarantine table is small and
//! write-light enough that per-record locking buys nothing. The
//! active→expired transition is a pull-based predicate
//! ([`QuarantineRecord::is_blocking`]) rather than a background sweep: the
//! sweeper that performs that transition is external (§4.5/4.6), the
//! kernel only needs to expose the check.

use crate::adapters::clock::Clock;
use crate::logging::event::EventLogger;
use crate::model::event::{SecurityEventBuilder, SecurityEventType, Severity};
use crate::model::policy::AdminControls;
use crate::model::quarantine::{QuarantineRecord, QuarantineStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuarantineError {
    #[error("no quarantine record for document: {0}")]
    NotFound(String),
    #[error("quarantine record is not active: {0}")]
    NotActive(String),
}

pub struct QuarantineStore {
    records: RwLock<HashMap<String, QuarantineRecord>>,
    events: Arc<EventLogger>,
    clock: Arc<dyn Clock>,
}

impl QuarantineStore {
    pub fn new(events: Arc<EventLogger>, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            events,
            clock,
        }
    }

    /// `Enforce(document, policy, reason)`. A no-op when the policy's admin
    /// controls disable quarantine. Otherwise creates and persists an
    /// active record and logs a `suspicious_activity` critical event.
    pub async fn enforce(
        &self,
        document_id: &str,
        policy_id: &str,
        admin_controls: &AdminControls,
        reason: &str,
    ) -> crate::error::KernelResult<Option<QuarantineRecord>> {
        if !admin_controls.enforce_quarantine {
            return Ok(None);
        }

        let now = self.clock.now_utc();
        let record = QuarantineRecord::new(document_id, policy_id, reason, now, admin_controls.quarantine_ttl_seconds);
        self.records.write().insert(document_id.to_string(), record.clone());

        let event = SecurityEventBuilder::new(
            SecurityEventType::SuspiciousActivity,
            Severity::Critical,
            "quarantine",
            document_id,
            format!("document quarantined: {reason}"),
            now,
        )
        .policy_id(policy_id)
        .build();
        self.events.append(event).await?;

        Ok(Some(record))
    }

    /// Whether `document_id` is currently blocked from admission.
    pub fn is_blocking(&self, document_id: &str) -> bool {
        let now = self.clock.now_utc();
        self.records
            .read()
            .get(document_id)
            .is_some_and(|r| r.is_blocking(now))
    }

    pub fn get(&self, document_id: &str) -> Option<QuarantineRecord> {
        self.records.read().get(document_id).cloned()
    }

    /// Transition a record to `released` or `reviewed` with notes. Fails if
    /// no record exists or it isn't active.
    pub fn review(
        &self,
        document_id: &str,
        reviewer_id: &str,
        notes: &str,
        status: QuarantineStatus,
    ) -> Result<QuarantineRecord, QuarantineError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(document_id)
            .ok_or_else(|| QuarantineError::NotFound(document_id.to_string()))?;
        if record.status != QuarantineStatus::Active {
            return Err(QuarantineError::NotActive(document_id.to_string()));
        }
        record.status = status;
        record.reviewer_id = Some(reviewer_id.to_string());
        record.reviewed_at = Some(self.clock.now_utc());
        record.review_notes = Some(notes.to_string());
        Ok(record.clone())
    }

    /// Transition every active record whose window has passed to `expired`.
    /// Exposed for a sweeper to call on its own schedule; the kernel never
    /// calls this itself.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_utc();
        let mut records = self.records.write();
        let mut count = 0;
        for record in records.values_mut() {
            if record.status == QuarantineStatus::Active && now >= record.expires_at {
                record.status = QuarantineStatus::Expired;
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SystemClock;
    use crate::logging::storage::MemoryStorage;

    fn store() -> QuarantineStore {
        let events = Arc::new(EventLogger::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock)));
        QuarantineStore::new(events, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_enforce_is_noop_when_disabled() {
        let store = store();
        let controls = AdminControls { enforce_quarantine: false, ..AdminControls::default() };
        let result = store.enforce("doc-1", "default", &controls, "missing_signature").await.unwrap();
        assert!(result.is_none());
        assert!(!store.is_blocking("doc-1"));
    }

    #[tokio::test]
    async fn test_enforce_blocks_admission() {
        let store = store();
        let controls = AdminControls::default();
        store.enforce("doc-1", "default", &controls, "missing_signature").await.unwrap();
        assert!(store.is_blocking("doc-1"));
    }

    #[tokio::test]
    async fn test_review_releases_document() {
        let store = store();
        let controls = AdminControls::default();
        store.enforce("doc-1", "default", &controls, "missing_signature").await.unwrap();

        store.review("doc-1", "reviewer-1", "false positive", QuarantineStatus::Released).unwrap();
        assert!(!store.is_blocking("doc-1"));
    }

    #[tokio::test]
    async fn test_review_without_record_fails() {
        let store = store();
        assert!(store.review("doc-1", "reviewer-1", "n/a", QuarantineStatus::Released).is_err());
    }

    #[test]
    fn test_sweep_expires_past_ttl() {
        let store = store();
        {
            let mut records = store.records.write();
            let now = Utc::now();
            records.insert(
                "doc-1".to_string(),
                QuarantineRecord::new("doc-1", "default", "reason", now - chrono::Duration::seconds(10), 1),
            );
        }
        assert_eq!(store.sweep_expired(), 1);
        assert!(!store.is_blocking("doc-1"));
    }

    use chrono::Utc;
}
