//! Unified error types for txgate.
//!
//! This is the canonical taxonomy for every operation the gateway exposes.
//! Handler code converts these into structured envelopes at the operation
//! boundary; nothing escapes to crash the process.

use thiserror::Error;

/// All txgate errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Statement submitted to the wrong execution mode.
    #[error("validation failed: {reason}")]
    Validation {
        /// Why the statement was rejected
        reason: String,
    },

    /// Unknown transaction id at commit/rollback time.
    #[error("transaction not found: {id}")]
    NotFound {
        /// The id that was not found
        id: String,
    },

    /// The registry is at its concurrency ceiling.
    #[error("too many concurrent transactions: {active} active (limit {max})")]
    ConcurrencyLimit {
        /// Transactions currently staged
        active: usize,
        /// Configured ceiling
        max: usize,
    },

    /// Statement, commit, or rollback failure reported by the database.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Connection-release failure. Always swallowed and logged by the
    /// release guard; it appears here only so pool implementations have a
    /// typed way to report it.
    #[error("release failed: {0}")]
    Release(String),

    /// Bug or invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for txgate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable string code for the wire envelope.
    ///
    /// These codes are frozen and must not change.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "ValidationError",
            Error::NotFound { .. } => "NotFoundError",
            Error::ConcurrencyLimit { .. } => "ConcurrencyLimitError",
            Error::Execution(_) => "ExecutionError",
            Error::Release(_) => "ReleaseError",
            Error::Internal(_) => "InternalError",
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Check if this error means the caller should retry later.
    ///
    /// Only the concurrency ceiling is retryable: capacity frees up as
    /// staged transactions are finalized.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyLimit { .. })
    }

    /// Check if this is a serious/unrecoverable error.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let cases: Vec<(Error, &str)> = vec![
            (
                Error::Validation { reason: "x".into() },
                "ValidationError",
            ),
            (Error::NotFound { id: "txg-1".into() }, "NotFoundError"),
            (
                Error::ConcurrencyLimit { active: 10, max: 10 },
                "ConcurrencyLimitError",
            ),
            (Error::Execution("boom".into()), "ExecutionError"),
            (Error::Release("boom".into()), "ReleaseError"),
            (Error::Internal("bug".into()), "InternalError"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_predicates() {
        assert!(Error::NotFound { id: "a".into() }.is_not_found());
        assert!(Error::Validation { reason: "r".into() }.is_validation());
        assert!(Error::ConcurrencyLimit { active: 1, max: 1 }.is_retryable());
        assert!(!Error::Execution("e".into()).is_retryable());
        assert!(Error::Internal("bug".into()).is_serious());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::ConcurrencyLimit { active: 10, max: 10 };
        let msg = err.to_string();
        assert!(msg.contains("10 active"));
        assert!(msg.contains("limit 10"));
    }
}
