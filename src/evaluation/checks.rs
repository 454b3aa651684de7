//! The four non-short-circuiting check categories (§4.2).
//!
//! Each function accumulates into the caller's violation/warning vectors
//! rather than returning early, so the engine always produces an
//! exhaustive report — grounded in the flat accumulate-and-continue shape
//! of `enterprise::compliance` scanners rather than the short-circuiting
//! `?`-chained style used elsewhere in the teacher, since this is the one
//! place the spec explicitly forbids it.

use crate::model::document::Document;
use crate::model::evaluation::{CheckCategory, Violation, Warning};
use crate::model::event::Severity;
use crate::model::policy::Policy;
use once_cell::sync::Lazy;
use regex::RegexSet;

static PII_TERMS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bemail\b",
        r"(?i)\bphone\b",
        r"(?i)\baddress\b",
        r"(?i)\bnational[- ]?id\b",
        r"(?i)\bssn\b",
    ])
    .unwrap()
});

static PHI_TERMS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bpatient\b",
        r"(?i)\bmedical\b",
        r"(?i)\bdiagnosis\b",
        r"(?i)\btreatment\b",
    ])
    .unwrap()
});

static DYNAMIC_EXEC_TOKENS: &[&str] = &["eval(", "new Function(", "setTimeout(", "setInterval("];
static STORAGE_API_NAMES: &[&str] = &["localStorage", "sessionStorage", "indexedDB"];
static OUTBOUND_SCHEMES: &[&str] = &["http://", "https://", "ws://", "wss://"];

fn violation(category: CheckCategory, code: &str, severity: Severity, message: impl Into<String>) -> Violation {
    Violation {
        category,
        code: code.to_string(),
        severity,
        message: message.into(),
    }
}

fn warning(category: CheckCategory, code: &str, message: impl Into<String>, recommendation: impl Into<String>) -> Warning {
    Warning {
        category,
        code: code.to_string(),
        message: message.into(),
        recommendation: recommendation.into(),
    }
}

/// 1. Admin controls.
pub fn check_admin_controls(document: &Document, policy: &Policy, violations: &mut Vec<Violation>, warnings: &mut Vec<Warning>) {
    let Some(admin) = &policy.admin_controls else {
        return;
    };

    let size = document.total_byte_size();
    if size > admin.max_document_bytes {
        violations.push(violation(
            CheckCategory::AdminControls,
            "max_document_size_exceeded",
            Severity::High,
            format!("document size {size} exceeds max {}", admin.max_document_bytes),
        ));
    }

    let module_count = document.guest_module_count() as u32;
    if module_count > admin.max_guest_modules {
        violations.push(violation(
            CheckCategory::AdminControls,
            "max_guest_modules_exceeded",
            Severity::Medium,
            format!("{module_count} guest modules exceeds max {}", admin.max_guest_modules),
        ));
    }

    for entry in &document.manifest {
        if !admin.allowed_file_types.contains(&entry.mime_type) {
            violations.push(violation(
                CheckCategory::AdminControls,
                "disallowed_mime_type",
                Severity::Medium,
                format!("{} is not an allowed MIME type", entry.mime_type),
            ));
        }
    }

    let text = document.scannable_text();
    for domain in &admin.blocked_domains {
        if text.contains(domain) {
            violations.push(violation(
                CheckCategory::AdminControls,
                "blocked_domain_reference",
                Severity::High,
                format!("content references blocked domain {domain}"),
            ));
        }
    }

    if admin.require_signature && !document.has_content_signature() {
        violations.push(violation(
            CheckCategory::AdminControls,
            "missing_signature",
            Severity::Critical,
            "policy requires a content signature but none is present",
        ));
    }

    let _ = warnings;
}

/// 2. Resource budget. CPU is warning-only; memory is a hard violation.
pub fn check_resource_budget(document: &Document, policy: &Policy, violations: &mut Vec<Violation>, warnings: &mut Vec<Warning>) {
    let Some(permissions) = &policy.permissions else {
        return;
    };

    let byte_size = document.total_byte_size();
    let estimated_memory = byte_size.saturating_mul(3);
    if estimated_memory > permissions.memory_limit_bytes {
        violations.push(violation(
            CheckCategory::ResourceBudget,
            "estimated_memory_exceeds_limit",
            Severity::High,
            format!("estimated memory {estimated_memory} exceeds limit {}", permissions.memory_limit_bytes),
        ));
    }

    let module_count = document.guest_module_count() as u64;
    let estimated_cpu_ms = 100 + module_count * 500 + (byte_size / 1024);
    if estimated_cpu_ms > permissions.cpu_limit_ms {
        warnings.push(warning(
            CheckCategory::ResourceBudget,
            "estimated_cpu_exceeds_limit",
            format!("estimated CPU time {estimated_cpu_ms}ms exceeds limit {}ms", permissions.cpu_limit_ms),
            "raise the policy's cpu_limit_ms or reduce guest module count/content size",
        ));
    }
}

/// 3. Compliance. PII/PHI hits are warnings; missing encryption under
/// `require_encryption` is a violation.
pub fn check_compliance(document: &Document, policy: &Policy, violations: &mut Vec<Violation>, warnings: &mut Vec<Warning>) {
    let Some(compliance) = &policy.compliance else {
        return;
    };

    let text = document.scannable_text();

    if compliance.gdpr && PII_TERMS.is_match(&text) {
        warnings.push(warning(
            CheckCategory::Compliance,
            "potential_pii_detected",
            "content contains terms that may indicate personal data",
            "review content for GDPR-regulated personal data before distribution",
        ));
    }

    if compliance.hipaa && PHI_TERMS.is_match(&text) {
        warnings.push(warning(
            CheckCategory::Compliance,
            "potential_phi_detected",
            "content contains terms that may indicate health information",
            "review content for HIPAA-regulated health information before distribution",
        ));
    }

    if compliance.require_encryption && !document.has_content_signature() {
        violations.push(violation(
            CheckCategory::Compliance,
            "encryption_required",
            Severity::High,
            "policy requires encryption but no content signature is present",
        ));
    }

    // The kernel cannot verify a document's actual classification against
    // the policy's declared one; always a warning when compliance is configured.
    warnings.push(warning(
        CheckCategory::Compliance,
        "classification_unverified",
        format!("kernel cannot verify content matches declared classification {:?}", compliance.data_classification),
        "confirm classification manually or via an external content scanner",
    ));
}

/// 4. Core permissions.
pub fn check_core_permissions(document: &Document, policy: &Policy, violations: &mut Vec<Violation>, warnings: &mut Vec<Warning>) {
    let Some(permissions) = &policy.permissions else {
        return;
    };

    let guest_size: u64 = document.guest_modules.values().map(|b| b.len() as u64).sum();
    if guest_size > permissions.memory_limit_bytes {
        violations.push(violation(
            CheckCategory::CorePermissions,
            "guest_memory_exceeds_policy",
            Severity::High,
            format!("guest module size {guest_size} exceeds memory limit {}", permissions.memory_limit_bytes),
        ));
    }

    let text = document.scannable_text();

    if matches!(permissions.execution_mode, crate::model::policy::ExecutionMode::None) && text.contains("<script") {
        violations.push(violation(
            CheckCategory::CorePermissions,
            "script_execution_disallowed",
            Severity::High,
            "execution mode is none but content contains a <script> token",
        ));
    }

    for token in DYNAMIC_EXEC_TOKENS {
        if text.contains(token) {
            warnings.push(warning(
                CheckCategory::CorePermissions,
                "dynamic_execution_token",
                format!("content contains dynamic-execution token `{token}`"),
                "avoid dynamic code construction in guest content",
            ));
        }
    }

    if !permissions.allow_networking {
        for scheme in OUTBOUND_SCHEMES {
            if text.contains(scheme) {
                warnings.push(warning(
                    CheckCategory::CorePermissions,
                    "outbound_url_scheme_present",
                    format!("content references outbound scheme `{scheme}` while networking is disallowed"),
                    "enable allow_networking or remove outbound references",
                ));
                break;
            }
        }
    }

    if !permissions.allow_filesystem {
        for api in STORAGE_API_NAMES {
            if text.contains(api) {
                violations.push(violation(
                    CheckCategory::CorePermissions,
                    "storage_api_disallowed",
                    Severity::Medium,
                    format!("content references `{api}` while filesystem access is disallowed"),
                ));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::DocumentMetadata;
    use crate::model::policy::{AdminControls, ComplianceSettings, PermissionBlock};
    use chrono::Utc;
    use std::collections::HashMap;

    fn base_document() -> Document {
        Document {
            id: "doc-1".into(),
            metadata: DocumentMetadata {
                title: "t".into(),
                author: "a".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            markup: String::new(),
            style: String::new(),
            script_spec: String::new(),
            static_fallback: String::new(),
            assets: HashMap::new(),
            manifest: Vec::new(),
            guest_modules: HashMap::new(),
            signatures: None,
        }
    }

    fn base_policy() -> Policy {
        Policy::builder("p", "author", Utc::now())
            .with_permissions(PermissionBlock::restrictive_default())
            .with_admin_controls(AdminControls::default())
            .with_compliance(ComplianceSettings::default())
    }

    #[test]
    fn test_missing_signature_is_critical_violation() {
        let mut policy = base_policy();
        policy.admin_controls.as_mut().unwrap().require_signature = true;
        let doc = base_document();

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        check_admin_controls(&doc, &policy, &mut violations, &mut warnings);

        assert!(violations.iter().any(|v| v.code == "missing_signature" && v.severity == Severity::Critical));
    }

    #[test]
    fn test_script_tag_violates_none_execution_mode() {
        let mut policy = base_policy();
        policy.permissions.as_mut().unwrap().execution_mode = crate::model::policy::ExecutionMode::None;
        let mut doc = base_document();
        doc.markup = "<script>alert(1)</script>".to_string();

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        check_core_permissions(&doc, &policy, &mut violations, &mut warnings);

        assert!(violations.iter().any(|v| v.code == "script_execution_disallowed"));
    }

    #[test]
    fn test_resource_budget_cpu_is_warning_only() {
        let mut policy = base_policy();
        policy.permissions.as_mut().unwrap().cpu_limit_ms = 100;
        let mut doc = base_document();
        for i in 0..5 {
            doc.guest_modules.insert(format!("m{i}"), vec![0u8; 10]);
        }

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        check_resource_budget(&doc, &policy, &mut violations, &mut warnings);

        assert!(warnings.iter().any(|w| w.code == "estimated_cpu_exceeds_limit"));
        assert!(!violations.iter().any(|v| v.code.contains("cpu")));
    }

    #[test]
    fn test_gdpr_pii_scan_emits_warning_not_violation() {
        let mut policy = base_policy();
        policy.compliance.as_mut().unwrap().gdpr = true;
        let mut doc = base_document();
        doc.markup = "contact us by email or phone".to_string();

        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        check_compliance(&doc, &policy, &mut violations, &mut warnings);

        assert!(warnings.iter().any(|w| w.code == "potential_pii_detected"));
        assert!(violations.is_empty());
    }
}
