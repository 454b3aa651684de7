//! Event logger (C1): append-only security events with filtered reads and
//! time-window statistics.

use crate::adapters::clock::Clock;
use crate::error::{KernelError, KernelResult};
use crate::logging::filter::{compute_event_statistics, EventFilter, EventStatistics};
use crate::logging::storage::{AppendOnlyStorage, Timestamped};
use crate::model::event::SecurityEvent;
use chrono::{DateTime, Utc};
use std::sync::Arc;

impl Timestamped for SecurityEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Default lookback window when a query omits a time range, mirroring the
/// teacher's `AuditQuery` default of 30 days.
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

pub struct EventLogger {
    storage: Arc<dyn AppendOnlyStorage<SecurityEvent>>,
    clock: Arc<dyn Clock>,
}

impl EventLogger {
    pub fn new(storage: Arc<dyn AppendOnlyStorage<SecurityEvent>>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn append(&self, event: SecurityEvent) -> KernelResult<()> {
        self.storage
            .append(&event)
            .await
            .map_err(|e| KernelError::Io(e.to_string()))
    }

    pub async fn query(&self, filter: &EventFilter) -> KernelResult<Vec<SecurityEvent>> {
        let end = filter.end.unwrap_or_else(|| self.clock.now_utc());
        let start = filter
            .start
            .unwrap_or_else(|| end - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS));

        let mut events = self
            .storage
            .query_range(start, end)
            .await
            .map_err(|e| KernelError::Io(e.to_string()))?;

        events.retain(|e| filter.matches(e));
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(filter.paginate(&events))
    }

    pub async fn statistics(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> KernelResult<EventStatistics> {
        let events = self
            .storage
            .query_range(start, end)
            .await
            .map_err(|e| KernelError::Io(e.to_string()))?;
        Ok(compute_event_statistics(&events, 10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SystemClock;
    use crate::logging::storage::MemoryStorage;
    use crate::model::event::{SecurityEventBuilder, SecurityEventType, Severity};

    fn logger() -> EventLogger {
        EventLogger::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_append_then_query_returns_event() {
        let logger = logger();
        let event = SecurityEventBuilder::new(
            SecurityEventType::PolicyViolation,
            Severity::High,
            "evaluator",
            "doc-1",
            "oversized document",
            Utc::now(),
        )
        .build();
        logger.append(event).await.unwrap();

        let results = logger.query(&EventFilter::new()).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_severity_filter_excludes_non_matching() {
        let logger = logger();
        logger
            .append(
                SecurityEventBuilder::new(
                    SecurityEventType::PolicyViolation,
                    Severity::Low,
                    "evaluator",
                    "doc-1",
                    "minor",
                    Utc::now(),
                )
                .build(),
            )
            .await
            .unwrap();

        let filter = EventFilter::new().severity(Severity::Critical);
        let results = logger.query(&filter).await.unwrap();
        assert!(results.is_empty());
    }
}
