//! DocSentinel - Security Kernel for Sandboxed Interactive Document Archives
//!
//! Command-line entry point. The archive container format itself is out of
//! scope (kernel Non-goals); this CLI reads policies and documents as plain
//! JSON so the kernel's admission logic can be exercised and inspected
//! without a real archive reader.

use clap::{Parser, Subcommand};
use docsentinel::adapters::clock::{Clock, SystemClock};
use docsentinel::adapters::crypto::Ed25519CryptoAdapter;
use docsentinel::broker::PermissionBroker;
use docsentinel::config::KernelConfig;
use docsentinel::logging::{AuditFilter, AuditLogger, EventLogger, FileStorage};
use docsentinel::model::document::Document;
use docsentinel::model::evaluation::UserContext;
use docsentinel::model::policy::Policy;
use docsentinel::monitor::ResourceMonitor;
use docsentinel::orchestrator::Orchestrator;
use docsentinel::policy::{seed_default_policy, PolicyStore, TemplateValue};
use docsentinel::quarantine::QuarantineStore;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docsentinel", version, about = "Security kernel for sandboxed interactive document archives")]
struct Cli {
    /// Path to a kernel config JSON file; defaults are used if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory to persist event/audit logs as JSONL; in-memory if omitted.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a document (JSON) against a policy directory and report the
    /// admission decision.
    Process {
        /// Path to a JSON-encoded `Document`.
        document: PathBuf,
        /// Directory of JSON-encoded `Policy` files to load.
        policy_dir: PathBuf,
        /// Policy id to evaluate against.
        #[arg(long, default_value = "default")]
        policy_id: String,
    },
    /// Load a policy directory and report system health.
    Status {
        /// Directory of JSON-encoded `Policy` files to load.
        policy_dir: PathBuf,
    },
    /// Scan a policy directory for configuration-level findings.
    ValidateConfig {
        /// Directory of JSON-encoded `Policy` files to load.
        policy_dir: PathBuf,
    },
    /// Instantiate a template policy already on disk in `policy_dir` into a
    /// new policy id, substituting the given variables.
    CreateFromTemplate {
        /// Directory of JSON-encoded `Policy` files to load.
        policy_dir: PathBuf,
        /// Id of the template policy to instantiate.
        template_id: String,
        /// Id to assign the instantiated policy.
        new_id: String,
        /// Author recorded on the instantiated policy.
        #[arg(long, default_value = "admin")]
        author: String,
        /// Memory limit, in bytes, to substitute into the template.
        #[arg(long)]
        memory_limit: Option<u64>,
        /// CPU limit, in milliseconds, to substitute into the template.
        #[arg(long)]
        cpu_limit: Option<u64>,
    },
}

fn load_policies(store: &PolicyStore, policy_dir: &PathBuf) -> anyhow::Result<()> {
    let mut loaded_any = false;
    for entry in std::fs::read_dir(policy_dir)? {
        let entry = entry?;
        if entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let contents = std::fs::read_to_string(entry.path())?;
        let policy: Policy = serde_json::from_str(&contents)?;
        store.create(policy)?;
        loaded_any = true;
    }
    if !loaded_any {
        store.create(seed_default_policy(chrono::Utc::now()))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("DocSentinel fatal error:");
        eprintln!("{panic_info}");
        if let Some(location) = panic_info.location() {
            eprintln!("Location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    log::info!("DocSentinel v{}", docsentinel::VERSION);

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => KernelConfig::from_file(path.to_str().unwrap_or_default())?,
        None => KernelConfig::default(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let exit_code = runtime.block_on(run(cli, config))?;
    std::process::exit(exit_code);
}

async fn run(cli: Cli, config: KernelConfig) -> anyhow::Result<i32> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policies = Arc::new(PolicyStore::new(config.policy_max_depth, clock.clone()));
    let crypto = Arc::new(Ed25519CryptoAdapter::new());
    let broker = Arc::new(PermissionBroker::new(policies.clone(), crypto, clock.clone()));
    let monitor = Arc::new(ResourceMonitor::new());

    let (events, audit) = match &cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).ok();
            let events = Arc::new(EventLogger::new(
                Arc::new(FileStorage::new(dir.join("events.jsonl"))),
                clock.clone(),
            ));
            let audit = Arc::new(AuditLogger::new(
                Arc::new(FileStorage::new(dir.join("audit.jsonl"))),
                clock.clone(),
            ));
            (events, audit)
        }
        None => (
            Arc::new(EventLogger::new(Arc::new(docsentinel::logging::MemoryStorage::new()), clock.clone())),
            Arc::new(AuditLogger::new(Arc::new(docsentinel::logging::MemoryStorage::new()), clock.clone())),
        ),
    };
    let quarantine = Arc::new(QuarantineStore::new(events.clone(), clock.clone()));
    let orchestrator = Orchestrator::new(
        policies.clone(),
        broker,
        monitor,
        quarantine,
        events,
        audit,
        clock,
        config,
    );

    match cli.command {
        Command::Process { document, policy_dir, policy_id } => {
            load_policies(&policies, &policy_dir)?;
            let contents = std::fs::read_to_string(&document)?;
            let document: Document = serde_json::from_str(&contents)?;
            let user_context = UserContext {
                user_id: "cli-user".to_string(),
                roles: Vec::new(),
                client_fingerprint: None,
            };

            let outcome = orchestrator.process_document(&document, &policy_id, user_context).await?;
            println!("{}", serde_json::to_string_pretty(&OutcomeReport::from(&outcome))?);
            Ok(if outcome.admitted { 0 } else { 1 })
        }
        Command::Status { policy_dir } => {
            load_policies(&policies, &policy_dir)?;
            let status = orchestrator.system_status().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(0)
        }
        Command::ValidateConfig { policy_dir } => {
            load_policies(&policies, &policy_dir)?;
            let report = orchestrator.validate_system_configuration();
            println!("{}", serde_json::to_string_pretty(&report)?);
            let export = orchestrator
                .export_audit_log(&AuditFilter::new())
                .await
                .unwrap_or_default();
            log::debug!("audit log export ({} bytes)", export.len());
            Ok(if report.overall_status.is_some() { 2 } else { 0 })
        }
        Command::CreateFromTemplate { policy_dir, template_id, new_id, author, memory_limit, cpu_limit } => {
            load_policies(&policies, &policy_dir)?;
            let mut vars = std::collections::HashMap::new();
            if let Some(bytes) = memory_limit {
                vars.insert("memory_limit".to_string(), TemplateValue::U64(bytes));
            }
            if let Some(ms) = cpu_limit {
                vars.insert("cpu_limit".to_string(), TemplateValue::U64(ms));
            }
            policies.create_from_template(&template_id, new_id, author, &vars)?;
            println!("policy created from template");
            Ok(0)
        }
    }
}

#[derive(serde::Serialize)]
struct OutcomeReport {
    admitted: bool,
    session_id: Option<String>,
    reason: String,
    quarantined: bool,
}

impl From<&docsentinel::ProcessOutcome> for OutcomeReport {
    fn from(outcome: &docsentinel::ProcessOutcome) -> Self {
        Self {
            admitted: outcome.admitted,
            session_id: outcome.session_id.map(|id| id.to_string()),
            reason: outcome.reason.clone(),
            quarantined: outcome.quarantined,
        }
    }
}
