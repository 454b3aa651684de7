//! Policy store (C3): CRUD, validation, DAG inheritance resolution, and
//! template instantiation.
//!
//! A single `RwLock` guards the whole policy map (§5: "C3 uses a single
//! reader-writer lock guarding the whole policy map; reads are shared,
//! writes exclusive"), grounded in the `HashMap<String, Policy>` ownership
//! style of `enterprise::auth::policy::PolicyEngine`, generalised from
//! flat ABAC statements to the inheritance-aware sidecar model this
//! domain needs.

use crate::adapters::clock::Clock;
use crate::model::policy::{
    AdminControls, ComplianceSettings, EventConfig, PermissionBlock, Policy, ResourceLimits,
};
use crate::policy::template::{instantiate, TemplateError, TemplateValue};
use crate::policy::validation::{validate_policy, ValidationError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("parent policy missing: {0}")]
    ParentMissing(String),
    #[error("inheritance depth exceeded")]
    InheritanceDepthExceeded,
    #[error("inheritance cycle detected")]
    InheritanceCycle,
    #[error("policy not found: {0}")]
    NotFound(String),
    #[error("cannot delete the default policy")]
    IsDefault,
    #[error("cannot delete a policy with children")]
    HasChildren,
}

impl From<ValidationError> for PolicyError {
    fn from(e: ValidationError) -> Self {
        PolicyError::InvalidPolicy(e.to_string())
    }
}

impl From<TemplateError> for PolicyError {
    fn from(e: TemplateError) -> Self {
        PolicyError::InvalidPolicy(e.to_string())
    }
}

/// Structural diff produced by [`PolicyStore::update`], handed to the
/// caller so it can write a single audit entry describing what changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDiff {
    pub changed_fields: Vec<String>,
}

pub struct PolicyStore {
    policies: RwLock<HashMap<String, Policy>>,
    max_depth: usize,
    clock: Arc<dyn Clock>,
}

impl PolicyStore {
    pub fn new(max_depth: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
            max_depth,
            clock,
        }
    }

    /// Walk `start`'s parent chain (not including `start`), returning the
    /// chain of ids. Fails with `InheritanceDepthExceeded` if the chain
    /// exceeds `max_depth`, or `InheritanceCycle` if `start` is revisited.
    fn walk_parents(
        &self,
        policies: &HashMap<String, Policy>,
        start: &str,
    ) -> Result<Vec<String>, PolicyError> {
        let mut chain = Vec::new();
        let mut current = start.to_string();
        loop {
            let policy = policies
                .get(&current)
                .ok_or_else(|| PolicyError::ParentMissing(current.clone()))?;
            let Some(parent_id) = &policy.parent_id else {
                break;
            };
            if parent_id == start {
                return Err(PolicyError::InheritanceCycle);
            }
            if chain.len() >= self.max_depth {
                return Err(PolicyError::InheritanceDepthExceeded);
            }
            chain.push(parent_id.clone());
            current = parent_id.clone();
        }
        Ok(chain)
    }

    pub fn create(&self, policy: Policy) -> Result<(), PolicyError> {
        validate_policy(&policy)?;

        let mut policies = self.policies.write();
        if policies.contains_key(&policy.id) {
            return Err(PolicyError::AlreadyExists(policy.id.clone()));
        }

        if let Some(parent_id) = &policy.parent_id {
            if !policies.contains_key(parent_id) {
                return Err(PolicyError::ParentMissing(parent_id.clone()));
            }
            // Insert provisionally to walk the chain including the new node,
            // then roll back if the walk fails.
            policies.insert(policy.id.clone(), policy.clone());
            let walk_result = self.walk_parents(&policies, &policy.id);
            if let Err(e) = walk_result {
                policies.remove(&policy.id);
                return Err(e);
            }
            if let Some(parent) = policies.get_mut(parent_id) {
                parent.children_ids.push(policy.id.clone());
            }
        } else {
            policies.insert(policy.id.clone(), policy);
        }

        Ok(())
    }

    /// `CreateFromTemplate(template_id, new_id, author, vars)` (§4.1):
    /// substitute `vars` into the policy stored at `template_id` and insert
    /// the result as `new_id`, surfacing the same typed errors as
    /// [`PolicyStore::create`] (`already-exists`, `parent-missing`,
    /// `invalid-policy`) plus the template's own `invalid-policy` mapping
    /// for a malformed variable.
    pub fn create_from_template(
        &self,
        template_id: &str,
        new_id: impl Into<String>,
        author: impl Into<String>,
        vars: &HashMap<String, TemplateValue>,
    ) -> Result<(), PolicyError> {
        let template = self.get_raw(template_id)?;
        let now = self.clock.now_utc();
        let policy = instantiate(&template, new_id, author, now, vars)?;
        self.create(policy)
    }

    /// Resolve the effective policy: walk the parent chain filling in any
    /// missing sidecar or permission block. The returned copy never
    /// mutates the store.
    pub fn get(&self, id: &str) -> Result<Policy, PolicyError> {
        let policies = self.policies.read();
        let mut effective = policies
            .get(id)
            .cloned()
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))?;

        let chain = self.walk_parents(&policies, id)?;
        for ancestor_id in chain {
            let ancestor = policies
                .get(&ancestor_id)
                .ok_or_else(|| PolicyError::ParentMissing(ancestor_id.clone()))?;
            fill_missing(&mut effective, ancestor);
        }
        Ok(effective)
    }

    /// Update an existing policy. Preserves `id`, `created_at`,
    /// `created_by`; recomputes `updated_at`; re-validates; rejects a
    /// parent change that would create a cycle. Returns a structural diff.
    pub fn update(&self, id: &str, mut new_policy: Policy) -> Result<PolicyDiff, PolicyError> {
        let mut policies = self.policies.write();
        let existing = policies
            .get(id)
            .cloned()
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))?;

        new_policy.id = existing.id.clone();
        new_policy.created_at = existing.created_at;
        new_policy.created_by = existing.created_by.clone();
        new_policy.updated_at = self.clock.now_utc();
        new_policy.children_ids = existing.children_ids.clone();
        new_policy.is_default = existing.is_default;

        validate_policy(&new_policy)?;

        if new_policy.parent_id != existing.parent_id {
            policies.insert(id.to_string(), new_policy.clone());
            if let Err(e) = self.walk_parents(&policies, id) {
                policies.insert(id.to_string(), existing);
                return Err(e);
            }
        } else {
            policies.insert(id.to_string(), new_policy.clone());
        }

        Ok(diff(&existing, &new_policy))
    }

    pub fn delete(&self, id: &str) -> Result<(), PolicyError> {
        let mut policies = self.policies.write();
        let policy = policies
            .get(id)
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))?;

        if policy.is_default {
            return Err(PolicyError::IsDefault);
        }
        if !policy.children_ids.is_empty() {
            return Err(PolicyError::HasChildren);
        }

        let parent_id = policy.parent_id.clone();
        policies.remove(id);
        if let Some(parent_id) = parent_id {
            if let Some(parent) = policies.get_mut(&parent_id) {
                parent.children_ids.retain(|c| c != id);
            }
        }
        Ok(())
    }

    pub fn list(&self) -> Vec<Policy> {
        self.policies.read().values().cloned().collect()
    }

    /// The stored policy as written, with no inheritance resolution. Used
    /// by the permission broker (C5) to check an ancestor's own permission
    /// block rather than a pre-merged effective one.
    pub fn get_raw(&self, id: &str) -> Result<Policy, PolicyError> {
        self.policies
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PolicyError::NotFound(id.to_string()))
    }

    /// Ordered ancestor ids of `id`, nearest parent first. Empty if `id` has
    /// no parent.
    pub fn parent_chain(&self, id: &str) -> Result<Vec<String>, PolicyError> {
        let policies = self.policies.read();
        self.walk_parents(&policies, id)
    }

    pub fn default_policy_id(&self) -> Option<String> {
        self.policies
            .read()
            .values()
            .find(|p| p.is_default)
            .map(|p| p.id.clone())
    }
}

fn fill_missing(effective: &mut Policy, ancestor: &Policy) {
    if effective.permissions.is_none() {
        effective.permissions = ancestor.permissions.clone();
    }
    if effective.admin_controls.is_none() {
        effective.admin_controls = ancestor.admin_controls.clone();
    }
    if effective.event_config.is_none() {
        effective.event_config = ancestor.event_config.clone();
    }
    if effective.resource_limits.is_none() {
        effective.resource_limits = ancestor.resource_limits.clone();
    }
    if effective.compliance.is_none() {
        effective.compliance = ancestor.compliance.clone();
    }
}

fn diff(before: &Policy, after: &Policy) -> PolicyDiff {
    let mut changed = Vec::new();
    if serde_json::to_string(&before.permissions).ok() != serde_json::to_string(&after.permissions).ok() {
        changed.push("permissions".to_string());
    }
    if serde_json::to_string(&before.admin_controls).ok() != serde_json::to_string(&after.admin_controls).ok() {
        changed.push("admin_controls".to_string());
    }
    if serde_json::to_string(&before.event_config).ok() != serde_json::to_string(&after.event_config).ok() {
        changed.push("event_config".to_string());
    }
    if serde_json::to_string(&before.resource_limits).ok() != serde_json::to_string(&after.resource_limits).ok() {
        changed.push("resource_limits".to_string());
    }
    if serde_json::to_string(&before.compliance).ok() != serde_json::to_string(&after.compliance).ok() {
        changed.push("compliance".to_string());
    }
    if before.parent_id != after.parent_id {
        changed.push("parent_id".to_string());
    }
    PolicyDiff {
        changed_fields: changed,
    }
}

/// Defaults used by [`crate::config::KernelConfig`] and tests that need a
/// ready-made starting policy. Kept here, not in `config`, since it
/// depends on the same sidecar defaults the validation rules assume.
pub fn seed_default_policy(now: chrono::DateTime<chrono::Utc>) -> Policy {
    Policy::builder("default", "system", now)
        .with_permissions(PermissionBlock::restrictive_default())
        .with_admin_controls(AdminControls::default())
        .with_event_config(EventConfig::default())
        .with_resource_limits(ResourceLimits::default())
        .with_compliance(ComplianceSettings::default())
        .as_default()
}
