//! Policy data model: the core permission block, its four sidecars, and
//! the policy record itself.
//!
//! Mirrors the field shape of the teacher's `enterprise::auth::policy`
//! `Policy`/`Statement` structs, including the fluent builder style, but
//! replaces RBAC statements with the fixed permission-block-plus-sidecars
//! shape this domain calls for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Execution mode granted to a document's guest script content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    None,
    Sandboxed,
    Trusted,
}

/// DOM access granted to guest content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomAccess {
    None,
    Read,
    Write,
}

/// Data classification used by the compliance sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataClassification {
    Public,
    Internal,
    Confidential,
    Restricted,
}

/// Default memory window, bytes: 1 KiB .. 128 MiB.
pub const MEMORY_WINDOW_BYTES: (u64, u64) = (1024, 128 * 1024 * 1024);
/// Default CPU window, milliseconds: 100 ms .. 30 s.
pub const CPU_WINDOW_MS: (u64, u64) = (100, 30_000);

/// Core permission block: ceilings, toggles, and the import capability set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionBlock {
    pub memory_limit_bytes: u64,
    pub cpu_limit_ms: u64,
    pub allow_networking: bool,
    pub allow_filesystem: bool,
    /// Allowed guest-module import names; `"*"` is a wildcard entry.
    pub allowed_imports: HashSet<String>,
    pub execution_mode: ExecutionMode,
    pub dom_access: DomAccess,
    /// Host allow-list for network capability requests; `"*"` is a wildcard.
    pub allowed_network_hosts: HashSet<String>,
    pub allowed_network_ports: HashSet<u16>,
}

impl PermissionBlock {
    /// A conservative block: smallest ceilings, no network/filesystem, no
    /// imports beyond `console`.
    pub fn restrictive_default() -> Self {
        Self {
            memory_limit_bytes: 16 * 1024 * 1024,
            cpu_limit_ms: 5_000,
            allow_networking: false,
            allow_filesystem: false,
            allowed_imports: ["console".to_string()].into_iter().collect(),
            execution_mode: ExecutionMode::Sandboxed,
            dom_access: DomAccess::Read,
            allowed_network_hosts: HashSet::new(),
            allowed_network_ports: HashSet::new(),
        }
    }

    pub fn allows_import(&self, name: &str) -> bool {
        self.allowed_imports.contains("*") || self.allowed_imports.contains(name)
    }

    pub fn allows_host(&self, host: &str) -> bool {
        self.allowed_network_hosts.contains("*") || self.allowed_network_hosts.contains(host)
    }
}

/// Admin-controls sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminControls {
    pub max_document_bytes: u64,
    pub max_guest_modules: u32,
    pub allowed_file_types: HashSet<String>,
    pub blocked_domains: HashSet<String>,
    pub require_signature: bool,
    pub trusted_signer_ids: HashSet<String>,
    pub enforce_quarantine: bool,
    pub quarantine_ttl_seconds: u64,
}

impl Default for AdminControls {
    fn default() -> Self {
        Self {
            max_document_bytes: 10 * 1024 * 1024,
            max_guest_modules: 8,
            allowed_file_types: [
                "text/html",
                "text/css",
                "image/png",
                "image/jpeg",
                "font/woff2",
                "application/json",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            blocked_domains: HashSet::new(),
            require_signature: false,
            trusted_signer_ids: HashSet::new(),
            enforce_quarantine: true,
            quarantine_ttl_seconds: 3600,
        }
    }
}

/// Event-config sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub log_level: String,
    pub audit_enabled: bool,
    pub retention_days: u32,
    pub alert_thresholds: HashMap<String, u32>,
    pub real_time_alerts: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            audit_enabled: true,
            retention_days: 90,
            alert_thresholds: HashMap::new(),
            real_time_alerts: false,
        }
    }
}

/// System-wide resource-limits sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_memory_bytes: u64,
    pub max_cpu_time_ms: u64,
    pub max_concurrent_documents: u32,
    pub max_network_bandwidth_bytes: u64,
    pub max_storage_bytes: u64,
    pub document_timeout_seconds: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: 512 * 1024 * 1024,
            max_cpu_time_ms: 300_000,
            max_concurrent_documents: 3,
            max_network_bandwidth_bytes: 10 * 1024 * 1024,
            max_storage_bytes: 100 * 1024 * 1024,
            document_timeout_seconds: 300,
        }
    }
}

/// Compliance sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceSettings {
    pub gdpr: bool,
    pub hipaa: bool,
    pub data_retention_days: u32,
    pub require_encryption: bool,
    pub data_classification: DataClassification,
}

impl Default for ComplianceSettings {
    fn default() -> Self {
        Self {
            gdpr: false,
            hipaa: false,
            data_retention_days: 365,
            require_encryption: false,
            data_classification: DataClassification::Internal,
        }
    }
}

/// A policy record as stored by the policy store (C3).
///
/// Sidecars are `Option` so inheritance resolution (`Get`) can tell "not
/// set here, walk up" apart from "explicitly set to the default value".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub permissions: Option<PermissionBlock>,
    pub admin_controls: Option<AdminControls>,
    pub event_config: Option<EventConfig>,
    pub resource_limits: Option<ResourceLimits>,
    pub compliance: Option<ComplianceSettings>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    /// Start building a policy with only identity fields set; sidecars are
    /// filled in with the fluent `with_*` methods before handing the result
    /// to the store.
    pub fn builder(id: impl Into<String>, author: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            children_ids: Vec::new(),
            permissions: None,
            admin_controls: None,
            event_config: None,
            resource_limits: None,
            compliance: None,
            is_default: false,
            created_at: now,
            created_by: author.into(),
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_permissions(mut self, block: PermissionBlock) -> Self {
        self.permissions = Some(block);
        self
    }

    pub fn with_admin_controls(mut self, controls: AdminControls) -> Self {
        self.admin_controls = Some(controls);
        self
    }

    pub fn with_event_config(mut self, config: EventConfig) -> Self {
        self.event_config = Some(config);
        self
    }

    pub fn with_resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = Some(limits);
        self
    }

    pub fn with_compliance(mut self, compliance: ComplianceSettings) -> Self {
        self.compliance = Some(compliance);
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// Policy id regex: non-empty `[A-Za-z0-9_-]+`.
pub fn is_valid_policy_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
