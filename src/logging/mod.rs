//! Event and audit logging (C1, C2): append-only storage, filter/query,
//! statistics, and CSV export.

pub mod audit;
pub mod event;
pub mod filter;
pub mod storage;

pub use audit::{AuditLogger, ExportFormat};
pub use event::EventLogger;
pub use filter::{compute_event_statistics, AuditFilter, EventFilter, EventStatistics};
pub use storage::{AppendOnlyStorage, FileStorage, MemoryStorage, StorageError, Timestamped};
