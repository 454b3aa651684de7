//! Security event model (C1).
//!
//! Field shape grounded in `enterprise::audit::event::AuditEvent`'s builder
//! pattern, adapted to the security-event taxonomy this domain needs
//! (event type + severity) rather than the admin-action shape audit
//! events use (that lives in [`crate::model::audit`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    PolicyViolation,
    UnauthorizedAccess,
    MaliciousContent,
    SignatureFailure,
    ResourceExceeded,
    SuspiciousActivity,
    ComplianceViolation,
    SystemBreach,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single security event written to the append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: SecurityEventType,
    pub severity: Severity,
    pub source: String,
    pub target: String,
    pub description: String,
    pub details: Value,
    pub policy_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<Uuid>,
    pub network_id: Option<String>,
    pub client_fingerprint: Option<String>,
}

/// Fluent builder for [`SecurityEvent`], mirroring the teacher's
/// `AuditEventBuilder`.
pub struct SecurityEventBuilder {
    event: SecurityEvent,
}

impl SecurityEventBuilder {
    pub fn new(
        event_type: SecurityEventType,
        severity: Severity,
        source: impl Into<String>,
        target: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event: SecurityEvent {
                id: Uuid::new_v4(),
                timestamp: now,
                event_type,
                severity,
                source: source.into(),
                target: target.into(),
                description: description.into(),
                details: Value::Null,
                policy_id: None,
                user_id: None,
                session_id: None,
                network_id: None,
                client_fingerprint: None,
            },
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.event.details = details;
        self
    }

    pub fn policy_id(mut self, id: impl Into<String>) -> Self {
        self.event.policy_id = Some(id.into());
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.event.user_id = Some(id.into());
        self
    }

    pub fn session_id(mut self, id: Uuid) -> Self {
        self.event.session_id = Some(id);
        self
    }

    pub fn client_fingerprint(mut self, fp: impl Into<String>) -> Self {
        self.event.client_fingerprint = Some(fp.into());
        self
    }

    pub fn build(self) -> SecurityEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_optional_fields_to_none() {
        let event = SecurityEventBuilder::new(
            SecurityEventType::PolicyViolation,
            Severity::High,
            "evaluator",
            "doc-1",
            "memory limit exceeded",
            Utc::now(),
        )
        .build();
        assert!(event.policy_id.is_none());
        assert!(event.user_id.is_none());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
