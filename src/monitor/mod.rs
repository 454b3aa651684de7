//! Resource monitor (C6): live (session, module) metrics, per-tick
//! violation checks, and the system-wide rollup.

pub mod monitor;
pub mod ticker;
pub mod violation;

pub use monitor::{ResourceMonitor, SystemRollup};
pub use ticker::{spawn_ticker, TickerHandle};
pub use violation::{Violation, ViolationKind};
