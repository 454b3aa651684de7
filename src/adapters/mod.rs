//! External collaborator contracts (C9): runtime, crypto, clock.
//!
//! Everything here is a trait the kernel depends on plus, where the spec
//! allows it, one test-grade implementation. Persisted storage for the
//! event and audit logs lives in [`crate::logging::storage`] instead,
//! since its shape is specific to that log format.

pub mod clock;
pub mod crypto;
pub mod runtime;

pub use clock::{Clock, FakeClock, SystemClock};
pub use crypto::{CryptoAdapter, Ed25519CryptoAdapter, SignerDescriptor, TrustLevel};
pub use runtime::{CallOutcome, InMemoryRuntimeAdapter, ModuleConfig, ModuleHandle, RuntimeAdapter};
