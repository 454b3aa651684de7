//! Evaluation result model (C4).

use crate::model::event::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Check category an evaluation violation/warning originates from. Used to
/// define the deterministic ordering of the result lists (§4.2: "check
/// index then left-to-right detection").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    AdminControls,
    ResourceBudget,
    Compliance,
    CorePermissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub category: CheckCategory,
    pub code: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub category: CheckCategory,
    pub code: String,
    pub message: String,
    pub recommendation: String,
}

/// User-supplied context for an evaluation/permission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    /// Opaque role labels; the kernel never grants or denies based on
    /// these directly (Non-goals: no general ACL/RBAC system).
    pub roles: Vec<String>,
    pub client_fingerprint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub document_id: String,
    pub policy_id: String,
    pub evaluated_at: DateTime<Utc>,
    pub user_context: UserContext,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    /// Optional derived score in [0, 100]; not asserted as an invariant.
    pub score: Option<u8>,
}

impl EvaluationResult {
    /// `compliant` is false iff any violation exists (§3).
    pub fn compliant(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether any violation reaches critical severity — the orchestrator's
    /// trigger for enforcing quarantine (§4.7).
    pub fn has_critical_violation(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(violations: Vec<Violation>) -> EvaluationResult {
        EvaluationResult {
            document_id: "doc-1".into(),
            policy_id: "default".into(),
            evaluated_at: Utc::now(),
            user_context: UserContext {
                user_id: "user-1".into(),
                roles: vec![],
                client_fingerprint: None,
            },
            violations,
            warnings: vec![],
            score: None,
        }
    }

    #[test]
    fn test_compliant_iff_no_violations() {
        assert!(sample_result(vec![]).compliant());
        let violation = Violation {
            category: CheckCategory::AdminControls,
            code: "max_document_size_exceeded".into(),
            severity: Severity::High,
            message: "too large".into(),
        };
        assert!(!sample_result(vec![violation]).compliant());
    }

    #[test]
    fn test_has_critical_violation() {
        let critical = Violation {
            category: CheckCategory::AdminControls,
            code: "missing_signature".into(),
            severity: Severity::Critical,
            message: "missing".into(),
        };
        assert!(sample_result(vec![critical]).has_critical_violation());
    }
}
