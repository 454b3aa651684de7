//! Session model (C5): a process-unique handle binding a document to an
//! effective policy and its loaded guest-module contexts.

use crate::adapters::runtime::ModuleHandle;
use crate::model::policy::PermissionBlock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Permission level assigned to a guest-module context within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulePermissionLevel {
    Normal,
    /// CPU budget exceeded; further CPU requests are denied (§4.4).
    Throttled,
    Terminated,
}

/// A loaded guest module within a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleContext {
    pub module_name: String,
    #[serde(skip, default)]
    pub runtime_handle: Option<ModuleHandle>,
    pub permission_level: ModulePermissionLevel,
}

/// A session as owned exclusively by the permission broker (C5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub document_id: String,
    pub policy_id: String,
    pub effective_permissions: PermissionBlock,
    pub created_at: DateTime<Utc>,
    pub modules: HashMap<String, ModuleContext>,
}

impl Session {
    pub fn new(document_id: impl Into<String>, policy_id: impl Into<String>, permissions: PermissionBlock, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.into(),
            policy_id: policy_id.into(),
            effective_permissions: permissions,
            created_at: now,
            modules: HashMap::new(),
        }
    }

    /// Whether the session's age exceeds `ttl_seconds`, evaluated at `now`.
    pub fn is_expired(&self, ttl_seconds: u64, now: DateTime<Utc>) -> bool {
        let age = (now - self.created_at).num_seconds().max(0) as u64;
        age > ttl_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::PermissionBlock;

    #[test]
    fn test_session_not_expired_immediately() {
        let now = Utc::now();
        let session = Session::new("doc-1", "default", PermissionBlock::restrictive_default(), now);
        assert!(!session.is_expired(3600, now));
    }

    #[test]
    fn test_session_expired_after_ttl() {
        let now = Utc::now();
        let session = Session::new("doc-1", "default", PermissionBlock::restrictive_default(), now);
        let later = now + chrono::Duration::seconds(3601);
        assert!(session.is_expired(3600, later));
    }
}
