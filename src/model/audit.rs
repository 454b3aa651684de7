//! Audit event model (C2): administrative mutations, directly grounded in
//! `enterprise::audit::event::{AuditEvent, AuditEventBuilder}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single administrative-action record written to the append-only audit
/// log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub resource: String,
    pub user_id: String,
    pub session_id: Option<Uuid>,
    pub client_fingerprint: Option<String>,
    pub success: bool,
    pub details: Value,
}

/// Fluent builder for [`AuditEvent`].
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(
        action: impl Into<String>,
        resource: impl Into<String>,
        user_id: impl Into<String>,
        success: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event: AuditEvent {
                id: Uuid::new_v4(),
                timestamp: now,
                action: action.into(),
                resource: resource.into(),
                user_id: user_id.into(),
                session_id: None,
                client_fingerprint: None,
                success,
                details: Value::Null,
            },
        }
    }

    pub fn session_id(mut self, id: Uuid) -> Self {
        self.event.session_id = Some(id);
        self
    }

    pub fn client_fingerprint(mut self, fp: impl Into<String>) -> Self {
        self.event.client_fingerprint = Some(fp.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.event.details = details;
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

/// Quote a CSV field per the fixed one-rule escaping the audit log export
/// uses: wrap in double quotes, doubling any embedded quote.
pub fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
