//! Kernel configuration.
//!
//! A serde-derived struct loaded from an optional JSON file, grounded in
//! `enterprise::config::EnterpriseConfig`'s `from_file`/`save` pair. Not a
//! general-purpose config framework: it covers the ticker period, cache
//! TTLs, and the default policy's starting ceilings, nothing else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Resource monitor tick period, in milliseconds (§4.4 default: 1000).
    pub monitor_tick_ms: u64,
    /// Direct-grant permission cache TTL, in seconds (§4.3).
    pub direct_grant_ttl_seconds: u64,
    /// Inheritance-fallback grant cache TTL, in seconds (§4.3).
    pub inherited_grant_ttl_seconds: u64,
    /// Session idle TTL before [`crate::broker::PermissionBroker::cleanup_expired`]
    /// reclaims it, in seconds.
    pub session_ttl_seconds: u64,
    /// Maximum policy inheritance depth (§4.1).
    pub policy_max_depth: usize,
    /// Starting memory ceiling for the seeded default policy, in bytes.
    pub default_memory_limit_bytes: u64,
    /// Starting CPU ceiling for the seeded default policy, in milliseconds.
    pub default_cpu_limit_ms: u64,
    /// Health-label thresholds for `SystemStatus` (§4.7), violations/24h.
    pub health_thresholds: HealthThresholds,
}

/// Violations-in-24h thresholds mapping to `SystemStatus`'s health label
/// (§4.7): `critical` above 50, `warning` above 20, `minor_issues` above 5,
/// else `healthy`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthThresholds {
    pub critical_above: u64,
    pub warning_above: u64,
    pub minor_issues_above: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            critical_above: 50,
            warning_above: 20,
            minor_issues_above: 5,
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            monitor_tick_ms: 1000,
            direct_grant_ttl_seconds: 3600,
            inherited_grant_ttl_seconds: 1800,
            session_ttl_seconds: 3600,
            policy_max_depth: 8,
            default_memory_limit_bytes: 16 * 1024 * 1024,
            default_cpu_limit_ms: 5_000,
            health_thresholds: HealthThresholds::default(),
        }
    }
}

impl KernelConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_one_second_tick() {
        assert_eq!(KernelConfig::default().monitor_tick_ms, 1000);
    }

    #[test]
    fn test_save_then_load_roundtrips() {
        let path = std::env::temp_dir().join(format!("kernel-config-test-{}.json", uuid::Uuid::new_v4()));
        let config = KernelConfig { monitor_tick_ms: 250, ..KernelConfig::default() };
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = KernelConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.monitor_tick_ms, 250);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(KernelConfig::from_file("/nonexistent/kernel-config.json").is_err());
    }
}
