//! # DocSentinel - Security Kernel for Sandboxed Interactive Document Archives
//!
//! A policy-driven security kernel that governs what a ZIP-shaped
//! interactive document archive is allowed to do once opened: what guest
//! modules may access, how much memory and CPU time they get, and what
//! happens when they step out of bounds.
//!
//! ## Architecture
//!
//! - `model`: shared data types (policy, document, session, metrics, events)
//! - `policy`: policy store (C3) — CRUD, DAG inheritance, validation, templates
//! - `evaluation`: evaluation engine (C4) — scores a document against a policy
//! - `broker`: permission broker (C5) — capability-tagged requests, sessions
//! - `monitor`: resource monitor (C6) — live metrics, tick-based violations
//! - `quarantine`: quarantine enforcement (C7)
//! - `logging`: event and audit logging (C1, C2)
//! - `orchestrator`: orchestrator (C8) — glues the above around admission
//! - `adapters`: external collaborator contracts (C9) — runtime, crypto, clock
//! - `config`: kernel configuration
//! - `error`: unified error type

#![warn(missing_docs)]

pub mod adapters;
pub mod broker;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod orchestrator;
pub mod policy;
pub mod quarantine;

pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use orchestrator::{Orchestrator, ProcessOutcome, SystemStatus};

/// Crate version, from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, from `Cargo.toml`.
pub const NAME: &str = env!("CARGO_PKG_NAME");
