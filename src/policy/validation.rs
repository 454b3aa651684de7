//! Policy validation rules (§4.1): id regex, ceiling windows, enum domains.

use crate::model::policy::{
    is_valid_policy_id, DataClassification, DomAccess, ExecutionMode, PermissionBlock, Policy,
    CPU_WINDOW_MS, MEMORY_WINDOW_BYTES,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// Restricted character class for MIME type strings.
static MIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9!#$&.+^_-]*/[a-zA-Z0-9][a-zA-Z0-9!#$&.+^_-]*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidId(String),
    MemoryOutOfWindow(u64),
    CpuOutOfWindow(u64),
    NegativeRetention,
    InvalidMime(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidId(id) => write!(f, "invalid policy id: {id}"),
            ValidationError::MemoryOutOfWindow(v) => write!(f, "memory limit {v} outside allowed window"),
            ValidationError::CpuOutOfWindow(v) => write!(f, "cpu limit {v} outside allowed window"),
            ValidationError::NegativeRetention => write!(f, "retention days must be non-negative"),
            ValidationError::InvalidMime(m) => write!(f, "invalid mime type: {m}"),
        }
    }
}

fn validate_permission_block(block: &PermissionBlock) -> Result<(), ValidationError> {
    let (min_mem, max_mem) = MEMORY_WINDOW_BYTES;
    if block.memory_limit_bytes < min_mem || block.memory_limit_bytes > max_mem {
        return Err(ValidationError::MemoryOutOfWindow(block.memory_limit_bytes));
    }
    let (min_cpu, max_cpu) = CPU_WINDOW_MS;
    if block.cpu_limit_ms < min_cpu || block.cpu_limit_ms > max_cpu {
        return Err(ValidationError::CpuOutOfWindow(block.cpu_limit_ms));
    }
    // ExecutionMode and DomAccess are closed enums; any constructed value is valid by
    // construction. Exhaustive match documents the validated domain explicitly.
    match block.execution_mode {
        ExecutionMode::None | ExecutionMode::Sandboxed | ExecutionMode::Trusted => {}
    }
    match block.dom_access {
        DomAccess::None | DomAccess::Read | DomAccess::Write => {}
    }
    Ok(())
}

/// Validate a policy's own fields (not its relation to the inheritance
/// graph, which the store checks separately).
pub fn validate_policy(policy: &Policy) -> Result<(), ValidationError> {
    if !is_valid_policy_id(&policy.id) {
        return Err(ValidationError::InvalidId(policy.id.clone()));
    }

    if let Some(ref block) = policy.permissions {
        validate_permission_block(block)?;
    }

    if let Some(ref admin) = policy.admin_controls {
        for mime in &admin.allowed_file_types {
            if !MIME_RE.is_match(mime) {
                return Err(ValidationError::InvalidMime(mime.clone()));
            }
        }
    }

    if let Some(ref event_config) = policy.event_config {
        // retention_days is u32, always non-negative by type; kept for
        // symmetry with the compliance sidecar's documented rule.
        let _ = event_config.retention_days;
    }

    if let Some(ref compliance) = policy.compliance {
        match compliance.data_classification {
            DataClassification::Public
            | DataClassification::Internal
            | DataClassification::Confidential
            | DataClassification::Restricted => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::PermissionBlock;
    use chrono::Utc;

    #[test]
    fn test_rejects_invalid_id() {
        let policy = Policy::builder("bad id!", "author", Utc::now());
        assert_eq!(
            validate_policy(&policy),
            Err(ValidationError::InvalidId("bad id!".to_string()))
        );
    }

    #[test]
    fn test_rejects_memory_below_window() {
        let mut block = PermissionBlock::restrictive_default();
        block.memory_limit_bytes = 1;
        let policy = Policy::builder("p1", "author", Utc::now()).with_permissions(block);
        assert!(matches!(validate_policy(&policy), Err(ValidationError::MemoryOutOfWindow(_))));
    }

    #[test]
    fn test_accepts_well_formed_policy() {
        let policy = Policy::builder("p1", "author", Utc::now())
            .with_permissions(PermissionBlock::restrictive_default());
        assert!(validate_policy(&policy).is_ok());
    }
}
