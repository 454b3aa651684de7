//! Crate-wide error type.
//!
//! Component-local error enums (`policy::PolicyError`, `logging::LogError`, ...)
//! convert into [`KernelError`] via `#[from]`, the same layering the teacher
//! crate uses between its storage-level and logger-level error enums.

use thiserror::Error;

/// Unified error surface returned by kernel operations that can fail.
///
/// Evaluation (C4) and permission broker (C5) responses are *not* expressed
/// through this type: per spec they never raise, they encode outcomes as
/// structured results so callers can reason about them without `match`ing
/// on an error path.
#[derive(Error, Debug)]
pub enum KernelError {
    /// Malformed policy, template variable, or request.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown policy, session, template, or quarantine record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate id, circular inheritance, depth exceeded, delete-with-children,
    /// delete-of-default.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Evaluation produced violations, permission denied, or quarantine active.
    #[error("denied: {0}")]
    Denied(String),

    /// Runtime limit breached; recoverable by corrective action.
    #[error("resource exceeded: {0}")]
    ResourceExceeded(String),

    /// Signature verification failed, or trust chain empty/revoked.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage/log append/read failure. Fatal for the affected operation,
    /// but the kernel remains usable.
    #[error("io error: {0}")]
    Io(String),

    /// Invariant violation. Never raised for ordinary user errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for KernelError {
    fn from(e: std::io::Error) -> Self {
        KernelError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for KernelError {
    fn from(e: serde_json::Error) -> Self {
        KernelError::Io(e.to_string())
    }
}

impl From<crate::policy::PolicyError> for KernelError {
    fn from(e: crate::policy::PolicyError) -> Self {
        use crate::policy::PolicyError;
        match e {
            PolicyError::AlreadyExists(_)
            | PolicyError::InheritanceDepthExceeded
            | PolicyError::InheritanceCycle
            | PolicyError::IsDefault
            | PolicyError::HasChildren => KernelError::Conflict(e.to_string()),
            PolicyError::InvalidPolicy(_) => KernelError::Validation(e.to_string()),
            PolicyError::ParentMissing(_) | PolicyError::NotFound(_) => {
                KernelError::NotFound(e.to_string())
            }
        }
    }
}

impl From<crate::broker::BrokerError> for KernelError {
    fn from(e: crate::broker::BrokerError) -> Self {
        use crate::broker::BrokerError;
        match e {
            BrokerError::SessionNotFound(_) => KernelError::NotFound(e.to_string()),
            BrokerError::Policy(policy_err) => policy_err.into(),
        }
    }
}

impl From<crate::quarantine::QuarantineError> for KernelError {
    fn from(e: crate::quarantine::QuarantineError) -> Self {
        use crate::quarantine::QuarantineError;
        match e {
            QuarantineError::NotFound(_) => KernelError::NotFound(e.to_string()),
            QuarantineError::NotActive(_) => KernelError::Conflict(e.to_string()),
        }
    }
}

/// Result type used throughout the kernel's component APIs.
pub type KernelResult<T> = Result<T, KernelError>;

/// Maps a [`KernelError`] to the HTTP status an external control plane would
/// use, per spec §7. The kernel does not serve HTTP itself (out of scope);
/// this exists so a caller wiring in a web framework has a single place to
/// look up the contract.
pub fn http_status(err: &KernelError) -> u16 {
    match err {
        KernelError::Validation(_) => 400,
        KernelError::NotFound(_) => 404,
        KernelError::Conflict(_) => 409,
        KernelError::Denied(_) => 403,
        KernelError::ResourceExceeded(_) => 429,
        KernelError::Crypto(_) => 401,
        KernelError::Io(_) => 500,
        KernelError::Internal(_) => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(http_status(&KernelError::Validation("x".into())), 400);
        assert_eq!(http_status(&KernelError::NotFound("x".into())), 404);
        assert_eq!(http_status(&KernelError::Conflict("x".into())), 409);
        assert_eq!(http_status(&KernelError::Denied("x".into())), 403);
        assert_eq!(http_status(&KernelError::ResourceExceeded("x".into())), 429);
        assert_eq!(http_status(&KernelError::Crypto("x".into())), 401);
        assert_eq!(http_status(&KernelError::Io("x".into())), 500);
        assert_eq!(http_status(&KernelError::Internal("x".into())), 500);
    }
}
