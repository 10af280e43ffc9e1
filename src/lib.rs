//! # txgate
//!
//! Staged-write transaction gateway for pooled database access.
//!
//! txgate exposes controlled database access through four operations. Read
//! statements run to completion and release their connection immediately.
//! Write statements are *staged*: they open a live transaction that is
//! deliberately left uncommitted until a second, explicit call confirms or
//! discards it, with a time-based safety net that reclaims abandoned
//! transactions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txgate::prelude::*;
//!
//! // Wire in your connection pool (anything implementing ConnectionPool)
//! let gateway = Gateway::builder()
//!     .pool(pool)
//!     .config(GatewayConfig::from_env())
//!     .build();
//!
//! // Reads complete immediately
//! let reply = gateway.run_read_only("select * from users").await;
//!
//! // Writes are staged: nothing is committed yet
//! let reply = gateway.run_write("update users set active = false").await;
//! // ... inspect reply for the transaction id, then decide:
//! gateway.commit("txg-...").await;   // or gateway.rollback("txg-...")
//!
//! // Graceful shutdown rolls back anything still open
//! gateway.shutdown().await;
//! ```
//!
//! ## Guarantees
//!
//! - Each staged connection is released to its pool exactly once, no
//!   matter which path finalizes the transaction: explicit commit,
//!   explicit rollback, timeout, or shutdown.
//! - At most one finalizer issues the terminal database command for a
//!   given transaction; concurrent attempts observe `NotFound`.
//! - The ceiling on concurrently staged transactions is enforced before
//!   any connection is acquired.

#![warn(missing_docs)]

mod gateway;

pub mod prelude;

// Re-export main entry points
pub use gateway::{Gateway, GatewayBuilder};

// Re-export the shared vocabulary
pub use txgate_core::{
    classify, Connection, ConnectionPool, Envelope, Error, FieldInfo, GatewayConfig,
    QueryOutcome, Result, StatementKind,
};

// Re-export the lifecycle core and protocol layers for embedders that
// want to compose them directly
pub use txgate_executor::{StagedExecutor, StagedWrite};
pub use txgate_txn::{release_quietly, Initiator, TransactionInfo, TransactionRegistry, TxId};

/// In-memory pool stubs, re-exported for embedders' test suites.
pub mod stub {
    pub use txgate_core::stub::{StubConnection, StubPool};
}
