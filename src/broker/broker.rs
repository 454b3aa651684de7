//! Permission broker (C5): session lifecycle and capability-tagged
//! permission requests.
//!
//! The session map sits behind one writer lock, the same split
//! `enterprise::marketplace::sandbox::Sandbox` uses between its `plugins`
//! map lock and each plugin's own `usage` lock — here the per-session state
//! is small enough to live directly in the map rather than behind a second
//! lock per entry.

use crate::adapters::clock::Clock;
use crate::adapters::crypto::CryptoAdapter;
use crate::broker::capability::{evaluate_capability, Capability, PermissionRequest, PermissionResponse};
use crate::broker::trust::verify_trust_chain;
use crate::model::session::Session;
use crate::policy::{PolicyError, PolicyStore};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const DIRECT_GRANT_TTL_SECONDS: i64 = 3600;
const INHERITED_GRANT_TTL_SECONDS: i64 = 1800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

pub struct PermissionBroker {
    sessions: RwLock<HashMap<Uuid, Session>>,
    cache: RwLock<HashMap<String, PermissionResponse>>,
    policy_store: Arc<PolicyStore>,
    crypto: Arc<dyn CryptoAdapter>,
    clock: Arc<dyn Clock>,
}

impl PermissionBroker {
    pub fn new(policy_store: Arc<PolicyStore>, crypto: Arc<dyn CryptoAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
            policy_store,
            crypto,
            clock,
        }
    }

    /// Create a session bound to a copy of `policy_id`'s effective
    /// permission block.
    pub fn create_session(&self, document_id: impl Into<String>, policy_id: &str) -> Result<Session, BrokerError> {
        let effective = self.policy_store.get(policy_id)?;
        let permissions = effective.permissions.unwrap_or_else(crate::model::policy::PermissionBlock::restrictive_default);
        let session = Session::new(document_id, policy_id, permissions, self.clock.now_utc());
        self.sessions.write().insert(session.id, session.clone());
        Ok(session)
    }

    /// Terminate a session and drop it from the registry. Unregistering its
    /// guest contexts from the resource monitor and writing the audit event
    /// are the orchestrator's (C8) responsibility.
    pub fn destroy_session(&self, session_id: Uuid) -> Result<Session, BrokerError> {
        self.sessions
            .write()
            .remove(&session_id)
            .ok_or(BrokerError::SessionNotFound(session_id))
    }

    /// Destroy every session older than `ttl_seconds`, returning the count
    /// removed.
    pub fn cleanup_expired(&self, ttl_seconds: u64) -> usize {
        let now = self.clock.now_utc();
        let mut sessions = self.sessions.write();
        let expired: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(ttl_seconds, now))
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            sessions.remove(id);
        }
        expired.len()
    }

    pub fn session(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.read().get(&session_id).cloned()
    }

    /// Count of sessions currently registered, for the orchestrator's status
    /// surface (§4.7).
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Evaluate a capability request against the session's policy, falling
    /// back to the parent policy chain on direct denial, then applying
    /// trust-chain verification if the effective policy requires it.
    pub fn request_permission(&self, request: PermissionRequest) -> Result<PermissionResponse, BrokerError> {
        let session = self
            .sessions
            .read()
            .get(&request.session_id)
            .cloned()
            .ok_or(BrokerError::SessionNotFound(request.session_id))?;

        let cache_key = format!(
            "{}|{}|{}|{}:{}",
            session.document_id,
            session.policy_id,
            request.module_name,
            request.capability.kind(),
            request.capability.param_key()
        );

        let now = self.clock.now_utc();
        if let Some(cached) = self.cache.read().get(&cache_key) {
            if cached.expires_at > now {
                return Ok(cached.clone());
            }
        }

        let mut response = self.evaluate_with_inheritance(&session, &request, now)?;
        self.apply_trust_chain(&session, &mut response, now)?;

        self.cache.write().insert(cache_key, response.clone());
        Ok(response)
    }

    fn evaluate_with_inheritance(
        &self,
        session: &Session,
        request: &PermissionRequest,
        now: DateTime<Utc>,
    ) -> Result<PermissionResponse, BrokerError> {
        let direct = evaluate_capability(&session.effective_permissions, &request.capability);
        if direct.granted {
            return Ok(PermissionResponse {
                granted: true,
                reason: direct.reason,
                restrictions: direct.restrictions,
                expires_at: now + chrono::Duration::seconds(DIRECT_GRANT_TTL_SECONDS),
                inherited_from: None,
                warnings: direct.warnings,
            });
        }

        for ancestor_id in self.policy_store.parent_chain(&session.policy_id)? {
            let ancestor = self.policy_store.get_raw(&ancestor_id)?;
            let Some(permissions) = &ancestor.permissions else {
                continue;
            };
            let outcome = evaluate_capability(permissions, &request.capability);
            if outcome.granted {
                let mut warnings = outcome.warnings;
                warnings.push(format!("granted via policy inheritance from {ancestor_id}"));
                return Ok(PermissionResponse {
                    granted: true,
                    reason: outcome.reason,
                    restrictions: outcome.restrictions,
                    expires_at: now + chrono::Duration::seconds(INHERITED_GRANT_TTL_SECONDS),
                    inherited_from: Some(ancestor_id),
                    warnings,
                });
            }
        }

        Ok(PermissionResponse {
            granted: false,
            reason: direct.reason,
            restrictions: direct.restrictions,
            expires_at: now + chrono::Duration::seconds(DIRECT_GRANT_TTL_SECONDS),
            inherited_from: None,
            warnings: direct.warnings,
        })
    }

    /// When the session's policy requires a content signature, a granted
    /// response is downgraded unless the document's trust chain resolves
    /// and validates.
    fn apply_trust_chain(
        &self,
        session: &Session,
        response: &mut PermissionResponse,
        now: DateTime<Utc>,
    ) -> Result<(), BrokerError> {
        if !response.granted {
            return Ok(());
        }
        let policy = self.policy_store.get(&session.policy_id)?;
        let requires_signature = policy.admin_controls.map(|a| a.require_signature).unwrap_or(false);
        if !requires_signature {
            return Ok(());
        }

        let outcome = verify_trust_chain(self.crypto.as_ref(), &session.document_id, now);
        if !outcome.valid {
            response.granted = false;
            response.warnings.push("trust_chain_validation_failed".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::SystemClock;
    use crate::adapters::crypto::Ed25519CryptoAdapter;
    use crate::model::policy::{AdminControls, Policy, PermissionBlock};

    fn broker() -> (PermissionBroker, Arc<PolicyStore>, Arc<Ed25519CryptoAdapter>) {
        let store = Arc::new(PolicyStore::new(8, Arc::new(SystemClock)));
        let crypto = Arc::new(Ed25519CryptoAdapter::new());
        let now = Utc::now();
        store
            .create(
                Policy::builder("default", "system", now)
                    .with_permissions(PermissionBlock::restrictive_default())
                    .as_default(),
            )
            .unwrap();
        let broker = PermissionBroker::new(store.clone(), crypto.clone(), Arc::new(SystemClock));
        (broker, store, crypto)
    }

    #[test]
    fn test_create_and_destroy_session() {
        let (broker, _, _) = broker();
        let session = broker.create_session("doc-1", "default").unwrap();
        assert!(broker.session(session.id).is_some());
        broker.destroy_session(session.id).unwrap();
        assert!(broker.session(session.id).is_none());
    }

    #[test]
    fn test_import_request_denied_without_allowlist() {
        let (broker, _, _) = broker();
        let session = broker.create_session("doc-1", "default").unwrap();
        let response = broker
            .request_permission(PermissionRequest {
                session_id: session.id,
                module_name: "m1".to_string(),
                capability: Capability::Import { name: "fetch".to_string() },
                timestamp: Utc::now(),
            })
            .unwrap();
        assert!(!response.granted);
    }

    #[test]
    fn test_network_granted_via_parent_policy_inheritance() {
        let store = Arc::new(PolicyStore::new(8, Arc::new(SystemClock)));
        let crypto = Arc::new(Ed25519CryptoAdapter::new());
        let now = Utc::now();
        let mut open_permissions = PermissionBlock::restrictive_default();
        open_permissions.allow_networking = true;
        open_permissions.allowed_network_hosts.insert("*".to_string());
        open_permissions.allowed_network_ports.insert(443);
        store
            .create(
                Policy::builder("parent", "system", now)
                    .with_permissions(open_permissions)
                    .as_default(),
            )
            .unwrap();
        store
            .create(
                Policy::builder("child", "system", now)
                    .with_permissions(PermissionBlock::restrictive_default())
                    .with_parent("parent"),
            )
            .unwrap();

        let broker = PermissionBroker::new(store, crypto, Arc::new(SystemClock));
        let session = broker.create_session("doc-1", "child").unwrap();
        let response = broker
            .request_permission(PermissionRequest {
                session_id: session.id,
                module_name: "m1".to_string(),
                capability: Capability::Network { host: "example.com".to_string(), port: 443 },
                timestamp: Utc::now(),
            })
            .unwrap();

        assert!(response.granted);
        assert_eq!(response.inherited_from.as_deref(), Some("parent"));
    }

    /// S5: parent allows 16 MiB, child allows 4 MiB; an 8 MiB request
    /// denies directly against the child and grants via inheritance.
    #[test]
    fn test_memory_over_child_limit_denies_then_grants_via_parent() {
        let store = Arc::new(PolicyStore::new(8, Arc::new(SystemClock)));
        let crypto = Arc::new(Ed25519CryptoAdapter::new());
        let now = Utc::now();
        let mut parent_permissions = PermissionBlock::restrictive_default();
        parent_permissions.memory_limit_bytes = 16 * 1024 * 1024;
        store
            .create(
                Policy::builder("parent", "system", now)
                    .with_permissions(parent_permissions)
                    .as_default(),
            )
            .unwrap();
        let mut child_permissions = PermissionBlock::restrictive_default();
        child_permissions.memory_limit_bytes = 4 * 1024 * 1024;
        store
            .create(
                Policy::builder("child", "system", now)
                    .with_permissions(child_permissions)
                    .with_parent("parent"),
            )
            .unwrap();

        let broker = PermissionBroker::new(store, crypto, Arc::new(SystemClock));
        let session = broker.create_session("doc-1", "child").unwrap();
        let response = broker
            .request_permission(PermissionRequest {
                session_id: session.id,
                module_name: "m1".to_string(),
                capability: Capability::Memory { requested_bytes: 8 * 1024 * 1024 },
                timestamp: Utc::now(),
            })
            .unwrap();

        assert!(response.granted);
        assert_eq!(response.inherited_from.as_deref(), Some("parent"));
        assert!((response.expires_at - now).num_minutes() <= 30);
    }

    #[test]
    fn test_required_signature_without_trust_chain_denies() {
        let store = Arc::new(PolicyStore::new(8, Arc::new(SystemClock)));
        let crypto = Arc::new(Ed25519CryptoAdapter::new());
        let now = Utc::now();
        store
            .create(
                Policy::builder("default", "system", now)
                    .with_permissions(PermissionBlock::restrictive_default())
                    .with_admin_controls(AdminControls { require_signature: true, ..AdminControls::default() })
                    .as_default(),
            )
            .unwrap();
        let broker = PermissionBroker::new(store, crypto, Arc::new(SystemClock));
        let session = broker.create_session("doc-1", "default").unwrap();

        let response = broker
            .request_permission(PermissionRequest {
                session_id: session.id,
                module_name: "m1".to_string(),
                capability: Capability::Memory { requested_bytes: 1024 },
                timestamp: Utc::now(),
            })
            .unwrap();

        assert!(!response.granted);
        assert!(response.warnings.iter().any(|w| w == "trust_chain_validation_failed"));
    }

    #[test]
    fn test_response_is_cached_until_expiry() {
        let (broker, _, _) = broker();
        let session = broker.create_session("doc-1", "default").unwrap();
        let request = PermissionRequest {
            session_id: session.id,
            module_name: "m1".to_string(),
            capability: Capability::Memory { requested_bytes: 1024 },
            timestamp: Utc::now(),
        };
        let first = broker.request_permission(request.clone()).unwrap();
        let second = broker.request_permission(request).unwrap();
        assert_eq!(first.expires_at, second.expires_at);
    }
}
