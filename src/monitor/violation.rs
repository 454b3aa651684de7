//! Per-tick resource violations (§4.4).
//!
//! Violations are data, not errors: the monitor never fails a tick, it
//! only reports what it observed. Deciding what to do about a violation
//! (terminate, throttle, log) is the orchestrator's job (§4.7).

use crate::model::event::Severity;
use crate::model::metrics::RuntimeMetrics;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MemoryLimitExceeded,
    CpuTimeExceeded,
    UnauthorizedNetworkAccess,
    UnauthorizedFilesystemAccess,
}

impl ViolationKind {
    pub fn severity(self) -> Severity {
        match self {
            ViolationKind::MemoryLimitExceeded | ViolationKind::CpuTimeExceeded => Severity::High,
            ViolationKind::UnauthorizedNetworkAccess | ViolationKind::UnauthorizedFilesystemAccess => {
                Severity::Critical
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::MemoryLimitExceeded => "memory_limit_exceeded",
            ViolationKind::CpuTimeExceeded => "cpu_time_exceeded",
            ViolationKind::UnauthorizedNetworkAccess => "unauthorized_network_access",
            ViolationKind::UnauthorizedFilesystemAccess => "unauthorized_filesystem_access",
        }
    }
}

/// A single violation observed for one (session, module) record on one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub session_id: Uuid,
    pub module_name: String,
    pub kind: ViolationKind,
    pub description: String,
}

impl Violation {
    fn new(session_id: Uuid, module_name: &str, kind: ViolationKind, description: String) -> Self {
        Self {
            session_id,
            module_name: module_name.to_string(),
            kind,
            description,
        }
    }
}

/// Evaluate one record's four checks. A record may raise more than one
/// violation in a single tick.
pub(crate) fn check_record(
    session_id: Uuid,
    module_name: &str,
    metrics: &RuntimeMetrics,
    allow_networking: bool,
    allow_filesystem: bool,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if metrics.memory.is_over_limit() {
        violations.push(Violation::new(
            session_id,
            module_name,
            ViolationKind::MemoryLimitExceeded,
            format!(
                "memory used {} exceeds limit {}",
                metrics.memory.used, metrics.memory.limit
            ),
        ));
    }

    if metrics.cpu.is_over_limit() {
        violations.push(Violation::new(
            session_id,
            module_name,
            ViolationKind::CpuTimeExceeded,
            format!(
                "cpu used {}ms exceeds limit {}ms",
                metrics.cpu.used_ms, metrics.cpu.limit_ms
            ),
        ));
    }

    if !allow_networking && metrics.network.requests > 0 {
        violations.push(Violation::new(
            session_id,
            module_name,
            ViolationKind::UnauthorizedNetworkAccess,
            format!("{} network request(s) while networking disallowed", metrics.network.requests),
        ));
    }

    if !allow_filesystem && (metrics.filesystem.reads + metrics.filesystem.writes) > 0 {
        violations.push(Violation::new(
            session_id,
            module_name,
            ViolationKind::UnauthorizedFilesystemAccess,
            format!(
                "{} filesystem operation(s) while filesystem access disallowed",
                metrics.filesystem.reads + metrics.filesystem.writes
            ),
        ));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::metrics::{CpuMetrics, FilesystemMetrics, MemoryMetrics, NetworkMetrics};

    fn record(memory: MemoryMetrics, cpu: CpuMetrics, network: NetworkMetrics, filesystem: FilesystemMetrics) -> RuntimeMetrics {
        RuntimeMetrics { memory, cpu, network, filesystem }
    }

    #[test]
    fn test_memory_over_limit_raises_high_violation() {
        let metrics = record(
            MemoryMetrics { used: 2048, peak: 2048, limit: 1024 },
            CpuMetrics::default(),
            NetworkMetrics::default(),
            FilesystemMetrics::default(),
        );
        let violations = check_record(Uuid::new_v4(), "m1", &metrics, true, true);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::MemoryLimitExceeded);
        assert_eq!(violations[0].kind.severity(), Severity::High);
    }

    #[test]
    fn test_network_use_without_allowance_is_critical() {
        let metrics = record(
            MemoryMetrics::default(),
            CpuMetrics::default(),
            NetworkMetrics { bytes: 100, requests: 1, last_activity_unix_ms: 0 },
            FilesystemMetrics::default(),
        );
        let violations = check_record(Uuid::new_v4(), "m1", &metrics, false, true);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::UnauthorizedNetworkAccess);
        assert_eq!(violations[0].kind.severity(), Severity::Critical);
    }

    #[test]
    fn test_clean_record_raises_nothing() {
        let metrics = record(
            MemoryMetrics { used: 10, peak: 10, limit: 1024 },
            CpuMetrics { used_ms: 10, limit_ms: 1000 },
            NetworkMetrics::default(),
            FilesystemMetrics::default(),
        );
        let violations = check_record(Uuid::new_v4(), "m1", &metrics, false, false);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_record_can_raise_multiple_violations_at_once() {
        let metrics = record(
            MemoryMetrics { used: 2048, peak: 2048, limit: 1024 },
            CpuMetrics { used_ms: 2000, limit_ms: 1000 },
            NetworkMetrics { bytes: 1, requests: 1, last_activity_unix_ms: 0 },
            FilesystemMetrics { reads: 1, writes: 0, bytes: 1 },
        );
        let violations = check_record(Uuid::new_v4(), "m1", &metrics, false, false);
        assert_eq!(violations.len(), 4);
    }
}
