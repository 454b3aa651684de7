//! Capability-tagged permission requests and responses (§4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single capability a guest module may request during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    Memory { requested_bytes: u64 },
    Cpu { requested_ms: u64 },
    Network { host: String, port: u16 },
    /// `path_scope` is carried but treated opaquely (Non-goals: filesystem
    /// path scoping semantics are not defined by the kernel).
    Filesystem { path_scope: Option<String> },
    Import { name: String },
}

impl Capability {
    /// Short tag used in cache keys and log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Capability::Memory { .. } => "memory",
            Capability::Cpu { .. } => "cpu",
            Capability::Network { .. } => "network",
            Capability::Filesystem { .. } => "filesystem",
            Capability::Import { .. } => "import",
        }
    }

    /// Stable key component identifying the request's parameters, used to
    /// distinguish e.g. two `network` requests for different hosts in the
    /// response cache.
    pub fn param_key(&self) -> String {
        match self {
            Capability::Memory { requested_bytes } => requested_bytes.to_string(),
            Capability::Cpu { requested_ms } => requested_ms.to_string(),
            Capability::Network { host, port } => format!("{host}:{port}"),
            Capability::Filesystem { path_scope } => path_scope.clone().unwrap_or_default(),
            Capability::Import { name } => name.clone(),
        }
    }
}

/// A permission request issued during module load or execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub session_id: Uuid,
    pub module_name: String,
    pub capability: Capability,
    pub timestamp: DateTime<Utc>,
}

/// Response to a [`PermissionRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResponse {
    pub granted: bool,
    pub reason: String,
    /// Effective clamps/denials relative to what was requested, e.g.
    /// `"memory limited to 1048576 bytes (requested 2097152)"`.
    pub restrictions: Vec<String>,
    pub expires_at: DateTime<Utc>,
    /// Set when this grant came from an ancestor policy rather than the
    /// session's own policy.
    pub inherited_from: Option<String>,
    /// Informational; never changes `granted`.
    pub warnings: Vec<String>,
}

/// Direct-capability evaluation outcome, before inheritance fallback or
/// trust-chain verification are applied.
pub(crate) struct CapabilityOutcome {
    pub granted: bool,
    pub reason: String,
    pub restrictions: Vec<String>,
    pub warnings: Vec<String>,
}

/// Evaluate `capability` against a single permission block. Every
/// capability is a direct boolean allow/deny against the ceiling or
/// allow-list in effect; `restrictions` explains the gap between what was
/// requested and what the policy allows regardless of the outcome (e.g.
/// `"memory limited to N bytes (requested M)"`, `"import X not allowed by
/// policy"`), so a denial carries the same restriction text a caller would
/// use to explain it to a user.
pub(crate) fn evaluate_capability(
    permissions: &crate::model::policy::PermissionBlock,
    capability: &Capability,
) -> CapabilityOutcome {
    const MEMORY_WARN_BYTES: u64 = 32 * 1024 * 1024;
    const CPU_WARN_MS: u64 = 10_000;

    match capability {
        Capability::Memory { requested_bytes } => {
            if *requested_bytes > permissions.memory_limit_bytes {
                let restriction = format!(
                    "memory limited to {} bytes (requested {requested_bytes})",
                    permissions.memory_limit_bytes
                );
                return CapabilityOutcome {
                    granted: false,
                    reason: restriction.clone(),
                    restrictions: vec![restriction],
                    warnings: Vec::new(),
                };
            }
            let mut warnings = Vec::new();
            if *requested_bytes > MEMORY_WARN_BYTES {
                warnings.push(format!("requested memory {requested_bytes} exceeds 32 MiB"));
            }
            CapabilityOutcome {
                granted: true,
                reason: "memory capability granted".to_string(),
                restrictions: Vec::new(),
                warnings,
            }
        }
        Capability::Cpu { requested_ms } => {
            if *requested_ms > permissions.cpu_limit_ms {
                let restriction = format!(
                    "cpu limited to {}ms (requested {requested_ms}ms)",
                    permissions.cpu_limit_ms
                );
                return CapabilityOutcome {
                    granted: false,
                    reason: restriction.clone(),
                    restrictions: vec![restriction],
                    warnings: Vec::new(),
                };
            }
            let mut warnings = Vec::new();
            if *requested_ms > CPU_WARN_MS {
                warnings.push(format!("requested cpu time {requested_ms}ms exceeds 10s"));
            }
            CapabilityOutcome {
                granted: true,
                reason: "cpu capability granted".to_string(),
                restrictions: Vec::new(),
                warnings,
            }
        }
        Capability::Network { host, port } => {
            if !permissions.allow_networking {
                return CapabilityOutcome {
                    granted: false,
                    reason: "networking not allowed by policy".to_string(),
                    restrictions: vec!["networking not allowed by policy".to_string()],
                    warnings: Vec::new(),
                };
            }
            if !permissions.allows_host(host) {
                return CapabilityOutcome {
                    granted: false,
                    reason: format!("host {host} not in allow-list"),
                    restrictions: vec![format!("host {host} not in allow-list")],
                    warnings: Vec::new(),
                };
            }
            if !permissions.allowed_network_ports.contains(port) {
                return CapabilityOutcome {
                    granted: false,
                    reason: format!("port {port} not allowed"),
                    restrictions: vec![format!("port {port} not allowed")],
                    warnings: Vec::new(),
                };
            }
            CapabilityOutcome {
                granted: true,
                reason: "network capability granted".to_string(),
                restrictions: Vec::new(),
                warnings: vec!["network access granted".to_string()],
            }
        }
        Capability::Filesystem { .. } => {
            if !permissions.allow_filesystem {
                return CapabilityOutcome {
                    granted: false,
                    reason: "filesystem access not allowed by policy".to_string(),
                    restrictions: vec!["filesystem access not allowed by policy".to_string()],
                    warnings: Vec::new(),
                };
            }
            CapabilityOutcome {
                granted: true,
                reason: "filesystem capability granted".to_string(),
                restrictions: Vec::new(),
                warnings: vec!["filesystem access granted".to_string()],
            }
        }
        Capability::Import { name } => {
            if !permissions.allows_import(name) {
                return CapabilityOutcome {
                    granted: false,
                    reason: format!("import {name} not allowed by policy"),
                    restrictions: vec![format!("import {name} not allowed by policy")],
                    warnings: Vec::new(),
                };
            }
            CapabilityOutcome {
                granted: true,
                reason: "import capability granted".to_string(),
                restrictions: Vec::new(),
                warnings: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::PermissionBlock;

    #[test]
    fn test_memory_over_limit_is_denied_directly() {
        let mut permissions = PermissionBlock::restrictive_default();
        permissions.memory_limit_bytes = 1024;
        let outcome = evaluate_capability(&permissions, &Capability::Memory { requested_bytes: 4096 });
        assert!(!outcome.granted);
        assert_eq!(outcome.restrictions.len(), 1);
    }

    #[test]
    fn test_memory_within_limit_is_granted() {
        let mut permissions = PermissionBlock::restrictive_default();
        permissions.memory_limit_bytes = 4096;
        let outcome = evaluate_capability(&permissions, &Capability::Memory { requested_bytes: 1024 });
        assert!(outcome.granted);
        assert!(outcome.restrictions.is_empty());
    }

    #[test]
    fn test_network_denied_without_allow_networking() {
        let permissions = PermissionBlock::restrictive_default();
        let outcome = evaluate_capability(
            &permissions,
            &Capability::Network { host: "example.com".to_string(), port: 443 },
        );
        assert!(!outcome.granted);
    }

    #[test]
    fn test_import_wildcard_allows_any_name() {
        let mut permissions = PermissionBlock::restrictive_default();
        permissions.allowed_imports.insert("*".to_string());
        let outcome = evaluate_capability(&permissions, &Capability::Import { name: "fetch".to_string() });
        assert!(outcome.granted);
    }
}
