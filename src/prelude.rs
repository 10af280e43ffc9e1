//! Convenient imports for txgate.
//!
//! Re-exports the types most embedders need:
//!
//! ```ignore
//! use txgate::prelude::*;
//!
//! let gateway = Gateway::builder().pool(pool).build();
//! let reply = gateway.run_read_only("select 1").await;
//! ```

// Main entry point
pub use crate::gateway::{Gateway, GatewayBuilder};

// Error handling
pub use txgate_core::{Error, Result};

// Operation surface types
pub use txgate_core::{Envelope, FieldInfo, GatewayConfig, QueryOutcome};

// The pool seam
pub use txgate_core::{Connection, ConnectionPool};

// Transaction tokens
pub use txgate_txn::TxId;

// Re-export serde_json for convenience
pub use serde_json::json;
