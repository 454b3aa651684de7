//! Orchestrator (C8): the single entry point that wires the policy store,
//! evaluation engine, permission broker, resource monitor, quarantine store,
//! and event/audit loggers around a document's admission lifecycle (§4.7).
//!
//! Grounded in `enterprise::mod::EnterpriseManager` as "the central
//! coordination point holding every subsystem behind one struct", but wired
//! eagerly at construction — there is no `initialize()`/feature-flag gate
//! here, since the kernel has no licensing concept to gate on.

use crate::adapters::clock::Clock;
use crate::broker::PermissionBroker;
use crate::config::KernelConfig;
use crate::error::KernelResult;
use crate::evaluation::EvaluationEngine;
use crate::logging::{AuditFilter, AuditLogger, EventFilter, EventLogger};
use crate::model::audit::AuditEventBuilder;
use crate::model::document::Document;
use crate::model::event::{SecurityEventBuilder, SecurityEventType, Severity};
use crate::model::evaluation::{EvaluationResult, UserContext, Violation};
use crate::model::policy::Policy;
use crate::monitor::ResourceMonitor;
use crate::policy::PolicyStore;
use crate::quarantine::QuarantineStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of [`Orchestrator::process_document`].
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub admitted: bool,
    pub session_id: Option<Uuid>,
    pub reason: String,
    pub evaluation: Option<EvaluationResult>,
    pub quarantined: bool,
}

/// Derived health label for [`SystemStatus`], thresholded on the count of
/// violation-class events in the trailing 24 hours (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLabel {
    Healthy,
    MinorIssues,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub health: HealthLabel,
    pub violations_last_24h: usize,
    pub active_sessions: usize,
    pub total_memory_bytes: u64,
    pub total_cpu_ms: u64,
    pub concurrent_documents: usize,
}

/// A single finding from [`Orchestrator::validate_system_configuration`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigIssue {
    pub code: String,
    pub severity: Severity,
    pub policy_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValidationReport {
    pub issues: Vec<ConfigIssue>,
    /// Highest severity among `issues`; `None` when the list is empty.
    pub overall_status: Option<Severity>,
}

/// The event types that count toward the violations-per-24h health metric.
const VIOLATION_EVENT_TYPES: &[SecurityEventType] = &[
    SecurityEventType::PolicyViolation,
    SecurityEventType::UnauthorizedAccess,
    SecurityEventType::ResourceExceeded,
    SecurityEventType::ComplianceViolation,
    SecurityEventType::SystemBreach,
];

/// Memory/CPU thresholds a policy must stay under to avoid the
/// `overly-permissive-policy` finding (§4.7).
const PERMISSIVE_MEMORY_BYTES: u64 = 64 * 1024 * 1024;
const PERMISSIVE_CPU_MS: u64 = 30_000;
const PERMISSIVE_DOCUMENT_BYTES: u64 = 100 * 1024 * 1024;

pub struct Orchestrator {
    policies: Arc<PolicyStore>,
    engine: EvaluationEngine,
    broker: Arc<PermissionBroker>,
    monitor: Arc<ResourceMonitor>,
    quarantine: Arc<QuarantineStore>,
    events: Arc<EventLogger>,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
    config: KernelConfig,
}

impl Orchestrator {
    pub fn new(
        policies: Arc<PolicyStore>,
        broker: Arc<PermissionBroker>,
        monitor: Arc<ResourceMonitor>,
        quarantine: Arc<QuarantineStore>,
        events: Arc<EventLogger>,
        audit: Arc<AuditLogger>,
        clock: Arc<dyn Clock>,
        config: KernelConfig,
    ) -> Self {
        Self {
            policies,
            engine: EvaluationEngine::new(),
            broker,
            monitor,
            quarantine,
            events,
            audit,
            clock,
            config,
        }
    }

    /// Admit or deny a document (§4.7):
    /// 1. deny immediately if quarantined;
    /// 2. evaluate against the effective policy, logging every violation;
    /// 3. enforce quarantine and deny on any critical violation;
    /// 4. deny on concurrency overload without creating a session (S6);
    /// 5. otherwise create a session, register every guest module with the
    ///    resource monitor, and admit.
    pub async fn process_document(
        &self,
        document: &Document,
        policy_id: &str,
        user_context: UserContext,
    ) -> KernelResult<ProcessOutcome> {
        let now = self.clock.now_utc();

        if self.quarantine.is_blocking(&document.id) {
            let outcome = ProcessOutcome {
                admitted: false,
                session_id: None,
                reason: "document is quarantined".to_string(),
                evaluation: None,
                quarantined: true,
            };
            self.audit_process(document, &user_context, &outcome, now).await?;
            return Ok(outcome);
        }

        let policy = self.policies.get(policy_id)?;
        let evaluation = self.engine.evaluate(document, &policy, user_context.clone(), now);
        for violation in &evaluation.violations {
            self.log_violation(document, &policy, violation, now).await?;
        }

        if evaluation.has_critical_violation() {
            let reason = evaluation
                .violations
                .iter()
                .find(|v| v.severity == Severity::Critical)
                .map(|v| v.message.clone())
                .unwrap_or_else(|| "critical violation".to_string());
            self.quarantine
                .enforce(&document.id, policy_id, admin_controls_or_default(&policy), &reason)
                .await?;
            let outcome = ProcessOutcome {
                admitted: false,
                session_id: None,
                reason,
                evaluation: Some(evaluation),
                quarantined: true,
            };
            self.audit_process(document, &user_context, &outcome, now).await?;
            return Ok(outcome);
        }

        if let Some(limits) = &policy.resource_limits {
            // Active session count, not the monitor's rollup: a document with
            // no guest modules never registers a record with the monitor but
            // still occupies a session slot.
            let concurrent = self.broker.session_count() as u32;
            if concurrent >= limits.max_concurrent_documents {
                let event = SecurityEventBuilder::new(
                    SecurityEventType::ResourceExceeded,
                    Severity::High,
                    "orchestrator",
                    &document.id,
                    format!(
                        "concurrent_documents_exceeded: {concurrent} active against limit {}",
                        limits.max_concurrent_documents
                    ),
                    now,
                )
                .policy_id(policy_id)
                .build();
                self.events.append(event).await?;

                let outcome = ProcessOutcome {
                    admitted: false,
                    session_id: None,
                    reason: "concurrent_documents_exceeded".to_string(),
                    evaluation: Some(evaluation),
                    quarantined: false,
                };
                self.audit_process(document, &user_context, &outcome, now).await?;
                return Ok(outcome);
            }
        }

        let session = self.broker.create_session(document.id.clone(), policy_id)?;
        let permissions = &session.effective_permissions;
        for module_name in document.guest_modules.keys() {
            self.monitor.register(
                session.id,
                module_name.clone(),
                permissions.memory_limit_bytes,
                permissions.cpu_limit_ms,
                permissions.allow_networking,
                permissions.allow_filesystem,
            );
        }

        let outcome = ProcessOutcome {
            admitted: true,
            session_id: Some(session.id),
            reason: "admitted".to_string(),
            evaluation: Some(evaluation),
            quarantined: false,
        };
        self.audit_process(document, &user_context, &outcome, now).await?;
        Ok(outcome)
    }

    async fn log_violation(
        &self,
        document: &Document,
        policy: &Policy,
        violation: &Violation,
        now: chrono::DateTime<Utc>,
    ) -> KernelResult<()> {
        let event_type = if violation.code.contains("signature") {
            SecurityEventType::SignatureFailure
        } else if violation.code.contains("memory") || violation.code.contains("cpu") {
            SecurityEventType::ResourceExceeded
        } else {
            SecurityEventType::PolicyViolation
        };

        let event = SecurityEventBuilder::new(
            event_type,
            violation.severity,
            "evaluation_engine",
            &document.id,
            violation.message.clone(),
            now,
        )
        .policy_id(policy.id.clone())
        .build();
        self.events.append(event).await
    }

    async fn audit_process(
        &self,
        document: &Document,
        user_context: &UserContext,
        outcome: &ProcessOutcome,
        now: chrono::DateTime<Utc>,
    ) -> KernelResult<()> {
        let mut builder =
            AuditEventBuilder::new("document.process", document.id.clone(), user_context.user_id.clone(), outcome.admitted, now)
                .details(serde_json::json!({ "reason": outcome.reason, "quarantined": outcome.quarantined }));
        if let Some(session_id) = outcome.session_id {
            builder = builder.session_id(session_id);
        }
        if let Some(fp) = &user_context.client_fingerprint {
            builder = builder.client_fingerprint(fp.clone());
        }
        self.audit.append(builder.build()).await
    }

    /// Read-only snapshot of system health (§4.7 step 5).
    pub async fn system_status(&self) -> KernelResult<SystemStatus> {
        let now = self.clock.now_utc();
        let start = now - chrono::Duration::hours(24);
        let mut filter = EventFilter::new().time_range(start, now);
        for event_type in VIOLATION_EVENT_TYPES {
            filter = filter.event_type(*event_type);
        }
        let violations_last_24h = self.events.query(&filter).await?.len();

        let thresholds = &self.config.health_thresholds;
        let count = violations_last_24h as u64;
        let health = if count > thresholds.critical_above {
            HealthLabel::Critical
        } else if count > thresholds.warning_above {
            HealthLabel::Warning
        } else if count > thresholds.minor_issues_above {
            HealthLabel::MinorIssues
        } else {
            HealthLabel::Healthy
        };

        let rollup = self.monitor.rollup();
        Ok(SystemStatus {
            health,
            violations_last_24h,
            active_sessions: self.broker.session_count(),
            total_memory_bytes: rollup.total_memory_bytes,
            total_cpu_ms: rollup.total_cpu_ms,
            concurrent_documents: rollup.concurrent_documents,
        })
    }

    /// Scan every stored policy for configuration-level findings (§4.7 step
    /// 5). Reads raw (un-merged) sidecars: a gap inherited from an ancestor
    /// surfaces on the ancestor that actually declares it, not on every
    /// descendant that inherits it.
    pub fn validate_system_configuration(&self) -> ConfigValidationReport {
        let policies = self.policies.list();
        let mut issues = Vec::new();

        if !policies.iter().any(|p| p.is_default) {
            issues.push(ConfigIssue {
                code: "missing_default_policy".to_string(),
                severity: Severity::High,
                policy_id: None,
                message: "no policy is marked as the system default".to_string(),
            });
        }

        for policy in &policies {
            if let Some(permissions) = &policy.permissions {
                let overly_permissive = permissions.memory_limit_bytes > PERMISSIVE_MEMORY_BYTES
                    || permissions.cpu_limit_ms > PERMISSIVE_CPU_MS
                    || permissions.allow_networking
                    || permissions.allow_filesystem
                    || permissions.execution_mode == crate::model::policy::ExecutionMode::Trusted
                    || permissions.dom_access == crate::model::policy::DomAccess::Write;
                if overly_permissive {
                    issues.push(ConfigIssue {
                        code: "overly_permissive_policy".to_string(),
                        severity: Severity::Medium,
                        policy_id: Some(policy.id.clone()),
                        message: format!("policy {} grants broader access than the recommended baseline", policy.id),
                    });
                }
            }

            if let Some(admin) = &policy.admin_controls {
                let overly_permissive_admin =
                    admin.max_document_bytes > PERMISSIVE_DOCUMENT_BYTES || !admin.require_signature;
                if overly_permissive_admin {
                    issues.push(ConfigIssue {
                        code: "overly_permissive_policy".to_string(),
                        severity: Severity::Medium,
                        policy_id: Some(policy.id.clone()),
                        message: format!(
                            "policy {} allows oversized documents or does not require a content signature",
                            policy.id
                        ),
                    });
                }
            }

            if let Some(event_config) = &policy.event_config {
                if !event_config.audit_enabled {
                    issues.push(ConfigIssue {
                        code: "missing_audit_logging".to_string(),
                        severity: Severity::Medium,
                        policy_id: Some(policy.id.clone()),
                        message: format!("policy {} has audit logging disabled", policy.id),
                    });
                }
            }
        }

        let overall_status = issues.iter().map(|i| i.severity).max();
        ConfigValidationReport { issues, overall_status }
    }

    /// Export the audit log's `document.process` history as CSV, delegating
    /// directly to the audit logger's own export (§4.2/4.7).
    pub async fn export_audit_log(&self, filter: &AuditFilter) -> KernelResult<String> {
        self.audit.export(filter, crate::logging::ExportFormat::Csv).await
    }
}

fn admin_controls_or_default(policy: &Policy) -> &crate::model::policy::AdminControls {
    static DEFAULT_CONTROLS: std::sync::OnceLock<crate::model::policy::AdminControls> = std::sync::OnceLock::new();
    policy
        .admin_controls
        .as_ref()
        .unwrap_or_else(|| DEFAULT_CONTROLS.get_or_init(crate::model::policy::AdminControls::default))
}
