//! Resource monitor (C6): live (session, module) metrics and the tick that
//! turns them into violations.
//!
//! A coarse lock guards the registration map only; each record's counters
//! live behind their own `parking_lot::RwLock`, the same split
//! `enterprise::marketplace::sandbox::Sandbox` uses between its `plugins`
//! map lock and each plugin's own `usage` lock (§5).

use crate::model::metrics::RuntimeMetrics;
use crate::monitor::violation::{check_record, Violation};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Key identifying a single registered (session, module) record.
type RecordKey = (Uuid, String);

struct Record {
    metrics: RwLock<RuntimeMetrics>,
    allow_networking: bool,
    allow_filesystem: bool,
}

/// System-wide rollup exposed to the orchestrator's status surface (§4.7).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SystemRollup {
    pub total_memory_bytes: u64,
    pub total_cpu_ms: u64,
    pub concurrent_documents: usize,
    pub violation_count: u64,
}

pub struct ResourceMonitor {
    records: RwLock<HashMap<RecordKey, Arc<Record>>>,
    violation_count: std::sync::atomic::AtomicU64,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            violation_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Register a (session, module) pair with its effective ceilings and
    /// access toggles. Re-registering the same key replaces the record.
    pub fn register(
        &self,
        session_id: Uuid,
        module_name: impl Into<String>,
        memory_limit_bytes: u64,
        cpu_limit_ms: u64,
        allow_networking: bool,
        allow_filesystem: bool,
    ) {
        let record = Arc::new(Record {
            metrics: RwLock::new(RuntimeMetrics::with_limits(memory_limit_bytes, cpu_limit_ms)),
            allow_networking,
            allow_filesystem,
        });
        self.records.write().insert((session_id, module_name.into()), record);
    }

    /// Drop every record belonging to `session_id`, returning the count removed.
    pub fn unregister_session(&self, session_id: Uuid) -> usize {
        let mut records = self.records.write();
        let keys: Vec<RecordKey> = records
            .keys()
            .filter(|(id, _)| *id == session_id)
            .cloned()
            .collect();
        for key in &keys {
            records.remove(key);
        }
        keys.len()
    }

    fn with_record<T>(&self, session_id: Uuid, module_name: &str, f: impl FnOnce(&Record) -> T) -> Option<T> {
        let records = self.records.read();
        records.get(&(session_id, module_name.to_string())).map(|r| f(r.as_ref()))
    }

    /// `UpdateMemory`: record current memory usage, tracking peak separately.
    pub fn update_memory(&self, session_id: Uuid, module_name: &str, used_bytes: u64) {
        self.with_record(session_id, module_name, |r| {
            r.metrics.write().memory.record_usage(used_bytes);
        });
    }

    /// `UpdateCPU`: record cumulative CPU time. Never decreases within a session.
    pub fn update_cpu(&self, session_id: Uuid, module_name: &str, used_ms: u64) {
        self.with_record(session_id, module_name, |r| {
            r.metrics.write().cpu.record_usage(used_ms);
        });
    }

    /// `RecordNetwork`: accumulate a network operation's byte count.
    pub fn record_network(&self, session_id: Uuid, module_name: &str, bytes: u64, now_unix_ms: i64) {
        self.with_record(session_id, module_name, |r| {
            let mut metrics = r.metrics.write();
            metrics.network.bytes += bytes;
            metrics.network.requests += 1;
            metrics.network.last_activity_unix_ms = now_unix_ms;
        });
    }

    /// `RecordFilesystem`: accumulate a filesystem read or write.
    pub fn record_filesystem(&self, session_id: Uuid, module_name: &str, bytes: u64, is_write: bool) {
        self.with_record(session_id, module_name, |r| {
            let mut metrics = r.metrics.write();
            if is_write {
                metrics.filesystem.writes += 1;
            } else {
                metrics.filesystem.reads += 1;
            }
            metrics.filesystem.bytes += bytes;
        });
    }

    pub fn metrics(&self, session_id: Uuid, module_name: &str) -> Option<RuntimeMetrics> {
        self.with_record(session_id, module_name, |r| r.metrics.read().clone())
    }

    /// Walk every registered record and return the violations observed this
    /// tick. Never fails; an empty tick is an empty vec.
    pub fn tick(&self) -> Vec<Violation> {
        let records = self.records.read();
        let mut violations = Vec::new();
        for ((session_id, module_name), record) in records.iter() {
            let metrics = record.metrics.read().clone();
            violations.extend(check_record(
                *session_id,
                module_name,
                &metrics,
                record.allow_networking,
                record.allow_filesystem,
            ));
        }
        if !violations.is_empty() {
            self.violation_count
                .fetch_add(violations.len() as u64, std::sync::atomic::Ordering::Relaxed);
        }
        violations
    }

    /// System-wide aggregation for the orchestrator's status surface.
    pub fn rollup(&self) -> SystemRollup {
        let records = self.records.read();
        let mut total_memory_bytes = 0u64;
        let mut total_cpu_ms = 0u64;
        let mut documents = std::collections::HashSet::new();
        for ((session_id, _), record) in records.iter() {
            let metrics = record.metrics.read();
            total_memory_bytes += metrics.memory.used;
            total_cpu_ms += metrics.cpu.used_ms;
            documents.insert(*session_id);
        }
        SystemRollup {
            total_memory_bytes,
            total_cpu_ms,
            concurrent_documents: documents.len(),
            violation_count: self.violation_count.load(std::sync::atomic::Ordering::Relaxed),
        }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_update_then_tick_raises_violation() {
        let monitor = ResourceMonitor::new();
        let session_id = Uuid::new_v4();
        monitor.register(session_id, "m1", 1024, 5000, false, false);
        monitor.update_memory(session_id, "m1", 4096);

        let violations = monitor.tick();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].module_name, "m1");
    }

    #[test]
    fn test_unregister_session_removes_its_records() {
        let monitor = ResourceMonitor::new();
        let session_id = Uuid::new_v4();
        monitor.register(session_id, "m1", 1024, 5000, false, false);
        monitor.register(session_id, "m2", 1024, 5000, false, false);
        assert_eq!(monitor.unregister_session(session_id), 2);
        assert!(monitor.metrics(session_id, "m1").is_none());
    }

    #[test]
    fn test_network_without_allowance_raises_critical_violation() {
        let monitor = ResourceMonitor::new();
        let session_id = Uuid::new_v4();
        monitor.register(session_id, "m1", 1024 * 1024, 5000, false, true);
        monitor.record_network(session_id, "m1", 128, 0);

        let violations = monitor.tick();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].kind,
            crate::monitor::violation::ViolationKind::UnauthorizedNetworkAccess
        );
    }

    #[test]
    fn test_rollup_aggregates_across_sessions() {
        let monitor = ResourceMonitor::new();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        monitor.register(session_a, "m1", 1024 * 1024, 5000, true, true);
        monitor.register(session_b, "m1", 1024 * 1024, 5000, true, true);
        monitor.update_memory(session_a, "m1", 100);
        monitor.update_memory(session_b, "m1", 200);
        monitor.update_cpu(session_a, "m1", 10);

        let rollup = monitor.rollup();
        assert_eq!(rollup.total_memory_bytes, 300);
        assert_eq!(rollup.total_cpu_ms, 10);
        assert_eq!(rollup.concurrent_documents, 2);
    }

    #[test]
    fn test_violation_count_accumulates_across_ticks() {
        let monitor = ResourceMonitor::new();
        let session_id = Uuid::new_v4();
        monitor.register(session_id, "m1", 1, 5000, false, false);
        monitor.update_memory(session_id, "m1", 1000);
        monitor.tick();
        monitor.tick();
        assert_eq!(monitor.rollup().violation_count, 2);
    }
}
