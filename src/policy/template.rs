//! Policy template instantiation (§4.1).
//!
//! Templates are themselves [`Policy`] values with placeholder sidecar
//! values; instantiation substitutes a documented variable set. Unknown
//! variables are ignored; typed coercion errors surface as
//! `invalid-variable`, mirroring the teacher's `PolicyBuilder` helpers that
//! assemble a concrete `Policy` from a small parameter set rather than a
//! general templating language.

use crate::model::policy::Policy;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    InvalidVariable(String),
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::InvalidVariable(name) => write!(f, "invalid template variable: {name}"),
        }
    }
}

/// A named, typed template variable accepted by [`instantiate`].
#[derive(Debug, Clone)]
pub enum TemplateValue {
    U64(u64),
    Bool(bool),
}

/// Documented variable set: `memory_limit`, `max_document_size`,
/// `require_signature`, `cpu_limit`, `allow_networking`.
pub fn instantiate(
    template: &Policy,
    new_id: impl Into<String>,
    author: impl Into<String>,
    now: chrono::DateTime<chrono::Utc>,
    variables: &HashMap<String, TemplateValue>,
) -> Result<Policy, TemplateError> {
    let mut policy = template.clone();
    policy.id = new_id.into();
    policy.created_by = author.into();
    policy.created_at = now;
    policy.updated_at = now;
    policy.children_ids.clear();
    policy.is_default = false;

    for (name, value) in variables {
        match name.as_str() {
            "memory_limit" => {
                let bytes = expect_u64(name, value)?;
                if let Some(ref mut perms) = policy.permissions {
                    perms.memory_limit_bytes = bytes;
                }
            }
            "cpu_limit" => {
                let ms = expect_u64(name, value)?;
                if let Some(ref mut perms) = policy.permissions {
                    perms.cpu_limit_ms = ms;
                }
            }
            "allow_networking" => {
                let allow = expect_bool(name, value)?;
                if let Some(ref mut perms) = policy.permissions {
                    perms.allow_networking = allow;
                }
            }
            "max_document_size" => {
                let bytes = expect_u64(name, value)?;
                if let Some(ref mut admin) = policy.admin_controls {
                    admin.max_document_bytes = bytes;
                }
            }
            "require_signature" => {
                let require = expect_bool(name, value)?;
                if let Some(ref mut admin) = policy.admin_controls {
                    admin.require_signature = require;
                }
            }
            // Unknown variables are ignored, per spec.
            _ => {}
        }
    }

    Ok(policy)
}

fn expect_u64(name: &str, value: &TemplateValue) -> Result<u64, TemplateError> {
    match value {
        TemplateValue::U64(v) => Ok(*v),
        _ => Err(TemplateError::InvalidVariable(name.to_string())),
    }
}

fn expect_bool(name: &str, value: &TemplateValue) -> Result<bool, TemplateError> {
    match value {
        TemplateValue::Bool(v) => Ok(*v),
        _ => Err(TemplateError::InvalidVariable(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::policy::{AdminControls, PermissionBlock};
    use chrono::Utc;

    fn sample_template() -> Policy {
        Policy::builder("template", "system", Utc::now())
            .with_permissions(PermissionBlock::restrictive_default())
            .with_admin_controls(AdminControls::default())
    }

    #[test]
    fn test_substitutes_memory_limit() {
        let mut vars = HashMap::new();
        vars.insert("memory_limit".to_string(), TemplateValue::U64(32 * 1024 * 1024));
        let policy = instantiate(&sample_template(), "p1", "admin", Utc::now(), &vars).unwrap();
        assert_eq!(policy.permissions.unwrap().memory_limit_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_variable_ignored() {
        let mut vars = HashMap::new();
        vars.insert("nonsense".to_string(), TemplateValue::Bool(true));
        assert!(instantiate(&sample_template(), "p1", "admin", Utc::now(), &vars).is_ok());
    }

    #[test]
    fn test_type_mismatch_is_invalid_variable() {
        let mut vars = HashMap::new();
        vars.insert("memory_limit".to_string(), TemplateValue::Bool(true));
        let err = instantiate(&sample_template(), "p1", "admin", Utc::now(), &vars).unwrap_err();
        assert_eq!(err, TemplateError::InvalidVariable("memory_limit".to_string()));
    }

    #[test]
    fn test_instantiated_policy_has_no_children() {
        let mut template = sample_template();
        template.children_ids.push("child-1".to_string());
        let policy = instantiate(&template, "p1", "admin", Utc::now(), &HashMap::new()).unwrap();
        assert!(policy.children_ids.is_empty());
    }
}
