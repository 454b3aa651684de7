//! Permission broker (C5): session lifecycle, capability-tagged permission
//! requests, inheritance fallback, and trust-chain verification.

pub mod broker;
pub mod capability;
pub mod trust;

pub use broker::{BrokerError, PermissionBroker};
pub use capability::{Capability, PermissionRequest, PermissionResponse};
