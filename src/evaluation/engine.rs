//! Evaluation engine (C4): scores a document against an effective policy.
//!
//! Checks run in a fixed order and never short-circuit (§4.2): each
//! category appends to the same violation/warning vectors, so the result
//! is deterministic — "given the same inputs, the output lists are
//! byte-identical (ordering defined by check index then left-to-right
//! detection)".

use crate::evaluation::checks::{
    check_admin_controls, check_compliance, check_core_permissions, check_resource_budget,
};
use crate::model::document::Document;
use crate::model::evaluation::{EvaluationResult, UserContext};
use crate::model::policy::Policy;
use chrono::{DateTime, Utc};

pub struct EvaluationEngine;

impl EvaluationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a document against an effective policy. `evaluated_at` is
    /// the only wall-clock input; everything else is pure.
    pub fn evaluate(
        &self,
        document: &Document,
        policy: &Policy,
        user_context: UserContext,
        evaluated_at: DateTime<Utc>,
    ) -> EvaluationResult {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        check_admin_controls(document, policy, &mut violations, &mut warnings);
        check_resource_budget(document, policy, &mut violations, &mut warnings);
        check_compliance(document, policy, &mut violations, &mut warnings);
        check_core_permissions(document, policy, &mut violations, &mut warnings);

        EvaluationResult {
            document_id: document.id.clone(),
            policy_id: policy.id.clone(),
            evaluated_at,
            user_context,
            violations,
            warnings,
            score: None,
        }
    }
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::DocumentMetadata;
    use crate::model::policy::{AdminControls, PermissionBlock};
    use std::collections::HashMap;

    fn sample_document() -> Document {
        Document {
            id: "doc-1".into(),
            metadata: DocumentMetadata {
                title: "t".into(),
                author: "a".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            markup: "<div>hi</div>".into(),
            style: String::new(),
            script_spec: String::new(),
            static_fallback: String::new(),
            assets: HashMap::new(),
            manifest: Vec::new(),
            guest_modules: HashMap::new(),
            signatures: None,
        }
    }

    fn sample_policy() -> Policy {
        Policy::builder("default", "system", Utc::now())
            .with_permissions(PermissionBlock::restrictive_default())
            .with_admin_controls(AdminControls::default())
            .as_default()
    }

    fn sample_context() -> UserContext {
        UserContext {
            user_id: "user-1".into(),
            roles: vec![],
            client_fingerprint: None,
        }
    }

    #[test]
    fn test_clean_document_is_compliant() {
        let engine = EvaluationEngine::new();
        let result = engine.evaluate(&sample_document(), &sample_policy(), sample_context(), Utc::now());
        assert!(result.compliant());
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let engine = EvaluationEngine::new();
        let now = Utc::now();
        let doc = sample_document();
        let policy = sample_policy();

        let r1 = engine.evaluate(&doc, &policy, sample_context(), now);
        let r2 = engine.evaluate(&doc, &policy, sample_context(), now);

        assert_eq!(
            serde_json::to_string(&r1.violations).unwrap(),
            serde_json::to_string(&r2.violations).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&r1.warnings).unwrap(),
            serde_json::to_string(&r2.warnings).unwrap()
        );
    }

    #[test]
    fn test_oversized_document_violates_admin_controls() {
        let engine = EvaluationEngine::new();
        let mut policy = sample_policy();
        policy.admin_controls.as_mut().unwrap().max_document_bytes = 1;

        let result = engine.evaluate(&sample_document(), &policy, sample_context(), Utc::now());
        assert!(!result.compliant());
        assert!(result.violations.iter().any(|v| v.code == "max_document_size_exceeded"));
    }
}
