//! Operation response envelopes.
//!
//! Every operation the gateway exposes returns an [`Envelope`]: a tagged
//! success/error/warning variant instead of an untyped dictionary. Errors
//! carry the stable code from [`Error::code`](crate::Error::code) plus a
//! human-readable message.
//!
//! Wire format:
//! ```json
//! {"status": "success", "data": {"transaction_id": "txg-..."}}
//! {"status": "error", "code": "NotFoundError", "message": "..."}
//! {"status": "warning", "message": "...", "data": {...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Structured response returned by every gateway operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    /// The operation completed.
    Success {
        /// Optional human-readable note.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Operation payload.
        data: serde_json::Value,
    },
    /// The operation failed. Nothing escapes the gateway as a raw error;
    /// this variant is the only failure surface callers see.
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// The operation completed, but not cleanly.
    Warning {
        /// What went wrong alongside the completed work.
        message: String,
        /// Operation payload.
        data: serde_json::Value,
    },
}

impl Envelope {
    /// Success with a payload.
    pub fn success(data: serde_json::Value) -> Self {
        Envelope::Success {
            message: None,
            data,
        }
    }

    /// Success with a payload and a note.
    pub fn success_with_message(message: impl Into<String>, data: serde_json::Value) -> Self {
        Envelope::Success {
            message: Some(message.into()),
            data,
        }
    }

    /// Warning with a payload.
    pub fn warning(message: impl Into<String>, data: serde_json::Value) -> Self {
        Envelope::Warning {
            message: message.into(),
            data,
        }
    }

    /// True for the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    /// True for the error variant.
    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error { .. })
    }

    /// The stable error code, if this is an error envelope.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Envelope::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<Error> for Envelope {
    fn from(err: Error) -> Self {
        Envelope::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl<E: Into<Envelope>> From<std::result::Result<serde_json::Value, E>> for Envelope {
    fn from(result: std::result::Result<serde_json::Value, E>) -> Self {
        match result {
            Ok(data) => Envelope::success(data),
            Err(err) => err.into(),
        }
    }
}
