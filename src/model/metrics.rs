//! Runtime metrics model (C6): per (session, module) live counters.
//!
//! Counters are monotonic within a session — grounded in the "Monotone
//! counters" law (§8) — so updates only ever grow `used`/cumulative
//! fields; `reset` is not part of this type's public surface.

use serde::{Deserialize, Serialize};

/// Memory usage for a single (session, module) record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub used: u64,
    pub peak: u64,
    pub limit: u64,
}

impl MemoryMetrics {
    pub fn record_usage(&mut self, used: u64) {
        self.used = used;
        if used > self.peak {
            self.peak = used;
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.used > self.limit
    }
}

/// CPU-time usage for a single (session, module) record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CpuMetrics {
    pub used_ms: u64,
    pub limit_ms: u64,
}

impl CpuMetrics {
    pub fn record_usage(&mut self, used_ms: u64) {
        if used_ms > self.used_ms {
            self.used_ms = used_ms;
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.used_ms > self.limit_ms
    }
}

/// Network activity counters. Strictly cumulative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub bytes: u64,
    pub requests: u64,
    pub last_activity_unix_ms: i64,
}

/// Filesystem activity counters. Strictly cumulative.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FilesystemMetrics {
    pub reads: u64,
    pub writes: u64,
    pub bytes: u64,
}

/// Full runtime-metrics record for one (session, module) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeMetrics {
    pub memory: MemoryMetrics,
    pub cpu: CpuMetrics,
    pub network: NetworkMetrics,
    pub filesystem: FilesystemMetrics,
}

impl RuntimeMetrics {
    pub fn with_limits(memory_limit: u64, cpu_limit_ms: u64) -> Self {
        Self {
            memory: MemoryMetrics {
                limit: memory_limit,
                ..Default::default()
            },
            cpu: CpuMetrics {
                limit_ms: cpu_limit_ms,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_peak_tracks_high_water_mark() {
        let mut m = MemoryMetrics::default();
        m.record_usage(100);
        m.record_usage(50);
        assert_eq!(m.used, 50);
        assert_eq!(m.peak, 100);
    }

    #[test]
    fn test_memory_over_limit() {
        let mut m = MemoryMetrics {
            limit: 1024,
            ..Default::default()
        };
        m.record_usage(2048);
        assert!(m.is_over_limit());
    }

    #[test]
    fn test_cpu_over_limit() {
        let mut c = CpuMetrics {
            limit_ms: 5000,
            ..Default::default()
        };
        c.record_usage(5001);
        assert!(c.is_over_limit());
    }
}
