//! Filter/query types and statistics shared by the event and audit loggers.
//!
//! Grounded in `enterprise::audit::query::{AuditQuery, QueryAggregation}`:
//! same fluent filter-builder shape, extended per spec §4.5 with the
//! event-type/severity/policy-id fields the security-event taxonomy needs.

use crate::model::event::{SecurityEventType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Conjunctive filter over the security event log.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub event_types: HashSet<SecurityEventType>,
    pub severities: HashSet<Severity>,
    pub user_id: Option<String>,
    pub policy_id: Option<String>,
    pub source: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn event_type(mut self, t: SecurityEventType) -> Self {
        self.event_types.insert(t);
        self
    }

    pub fn severity(mut self, s: Severity) -> Self {
        self.severities.insert(s);
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn policy_id(mut self, id: impl Into<String>) -> Self {
        self.policy_id = Some(id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &crate::model::event::SecurityEvent) -> bool {
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&event.severity) {
            return false;
        }
        if let Some(ref uid) = self.user_id {
            if event.user_id.as_deref() != Some(uid.as_str()) {
                return false;
            }
        }
        if let Some(ref pid) = self.policy_id {
            if event.policy_id.as_deref() != Some(pid.as_str()) {
                return false;
            }
        }
        if let Some(ref source) = self.source {
            if &event.source != source {
                return false;
            }
        }
        true
    }

    /// Apply `offset`/`limit` pagination to an already-filtered, time-sorted
    /// slice of events.
    pub fn paginate<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(limit) => (start + limit).min(items.len()),
            None => items.len(),
        };
        items[start..end].to_vec()
    }
}

/// Conjunctive filter over the audit log. Mirrors [`EventFilter`] with the
/// action/resource/success fields the audit taxonomy needs instead of
/// event-type/severity.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub actions: HashSet<String>,
    pub resource: Option<String>,
    pub user_id: Option<String>,
    pub success: Option<bool>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.insert(action.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, event: &crate::model::audit::AuditEvent) -> bool {
        if !self.actions.is_empty() && !self.actions.contains(&event.action) {
            return false;
        }
        if let Some(ref resource) = self.resource {
            if &event.resource != resource {
                return false;
            }
        }
        if let Some(ref uid) = self.user_id {
            if &event.user_id != uid {
                return false;
            }
        }
        if let Some(success) = self.success {
            if event.success != success {
                return false;
            }
        }
        true
    }

    pub fn paginate<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let start = self.offset.min(items.len());
        let end = match self.limit {
            Some(limit) => (start + limit).min(items.len()),
            None => items.len(),
        };
        items[start..end].to_vec()
    }
}

/// Statistics over a filtered window of the event log (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStatistics {
    pub total_count: usize,
    pub by_type: HashMap<SecurityEventType, usize>,
    pub by_severity: HashMap<Severity, usize>,
    /// Hourly buckets formatted `YYYY-MM-DD HH`.
    pub by_hour: HashMap<String, usize>,
    pub top_sources: Vec<(String, usize)>,
    pub top_users: Vec<(String, usize)>,
}

/// Build statistics from an already-filtered event slice. `top_n` bounds
/// the sources/users lists.
pub fn compute_event_statistics(
    events: &[crate::model::event::SecurityEvent],
    top_n: usize,
) -> EventStatistics {
    let mut by_type: HashMap<SecurityEventType, usize> = HashMap::new();
    let mut by_severity: HashMap<Severity, usize> = HashMap::new();
    let mut by_hour: HashMap<String, usize> = HashMap::new();
    let mut by_source: HashMap<String, usize> = HashMap::new();
    let mut by_user: HashMap<String, usize> = HashMap::new();

    for event in events {
        *by_type.entry(event.event_type).or_insert(0) += 1;
        *by_severity.entry(event.severity).or_insert(0) += 1;
        *by_hour
            .entry(event.timestamp.format("%Y-%m-%d %H").to_string())
            .or_insert(0) += 1;
        *by_source.entry(event.source.clone()).or_insert(0) += 1;
        if let Some(ref user) = event.user_id {
            *by_user.entry(user.clone()).or_insert(0) += 1;
        }
    }

    let mut top_sources: Vec<(String, usize)> = by_source.into_iter().collect();
    top_sources.sort_by(|a, b| b.1.cmp(&a.1));
    top_sources.truncate(top_n);

    let mut top_users: Vec<(String, usize)> = by_user.into_iter().collect();
    top_users.sort_by(|a, b| b.1.cmp(&a.1));
    top_users.truncate(top_n);

    EventStatistics {
        total_count: events.len(),
        by_type,
        by_severity,
        by_hour,
        top_sources,
        top_users,
    }
}
