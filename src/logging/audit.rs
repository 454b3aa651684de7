//! Audit logger (C2): append-only administrative actions with filtered
//! reads and structured/CSV export.

use crate::adapters::clock::Clock;
use crate::error::{KernelError, KernelResult};
use crate::logging::filter::AuditFilter;
use crate::logging::storage::{AppendOnlyStorage, Timestamped};
use crate::model::audit::{csv_quote, AuditEvent};
use chrono::{DateTime, Utc};
use std::sync::Arc;

impl Timestamped for AuditEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Export format for [`AuditLogger::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Structured,
    Csv,
}

pub struct AuditLogger {
    storage: Arc<dyn AppendOnlyStorage<AuditEvent>>,
    clock: Arc<dyn Clock>,
}

impl AuditLogger {
    pub fn new(storage: Arc<dyn AppendOnlyStorage<AuditEvent>>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub async fn append(&self, event: AuditEvent) -> KernelResult<()> {
        self.storage
            .append(&event)
            .await
            .map_err(|e| KernelError::Io(e.to_string()))
    }

    pub async fn query(&self, filter: &AuditFilter) -> KernelResult<Vec<AuditEvent>> {
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

    /// Export matching records. CSV rows use header
    /// `timestamp,action,resource,user_id,success,details` with `details`
    /// as a quoted JSON-like payload.
    pub async fn export(&self, filter: &AuditFilter, format: ExportFormat) -> KernelResult<String> {
        let events = self.query(filter).await?;
        match format {
            ExportFormat::Structured => {
                serde_json::to_string(&events).map_err(|e| KernelError::Io(e.to_string()))
            }
            ExportFormat::Csv => {
                let mut out = String::from("timestamp,action,resource,user_id,success,details\n");
                for event in &events {
                    let details = serde_json::to_string(&event.details)
                        .map_err(|e| KernelError::Io(e.to_string()))?;
                    out.push_str(&format!(
                        "{},{},{},{},{},{}\n",
                        event.timestamp.to_rfc3339(),
                        csv_quote(&event.action),
                        csv_quote(&event.resource),
                        csv_quote(&event.user_id),
                        event.success,
                        csv_quote(&details),
                    ));
                }
                Ok(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SystemClock;
    use crate::logging::storage::MemoryStorage;
    use crate::model::audit::AuditEventBuilder;

    fn logger() -> AuditLogger {
        AuditLogger::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn test_append_then_query() {
        let logger = logger();
        logger
            .append(AuditEventBuilder::new("policy.create", "default", "admin-1", true, Utc::now()).build())
            .await
            .unwrap();

        let results = logger.query(&AuditFilter::new()).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_csv_export_has_expected_header() {
        let logger = logger();
        logger
            .append(AuditEventBuilder::new("policy.create", "default", "admin-1", true, Utc::now()).build())
            .await
            .unwrap();

        let csv = logger.export(&AuditFilter::new(), ExportFormat::Csv).await.unwrap();
        assert!(csv.starts_with("timestamp,action,resource,user_id,success,details\n"));
        assert!(csv.contains("\"policy.create\""));
    }

    #[tokio::test]
    async fn test_filter_by_success() {
        let logger = logger();
        logger
            .append(AuditEventBuilder::new("policy.update", "default", "admin-1", false, Utc::now()).build())
            .await
            .unwrap();

        let filter = AuditFilter::new().success(true);
        let results = logger.query(&filter).await.unwrap();
        assert!(results.is_empty());
    }
}
