//! Shared vocabulary for the txgate workspace.
//!
//! This crate holds everything the other members agree on: the error
//! taxonomy, gateway configuration, statement classification, the result
//! and envelope types sent back to callers, and the `Connection`/
//! `ConnectionPool` trait seam behind which the real database pool lives.
//!
//! The pool itself is an external collaborator. [`stub`] provides in-memory
//! stand-ins for it that record every statement and release, used by the
//! test suites of every crate in the workspace.

pub mod config;
pub mod envelope;
pub mod error;
pub mod pool;
pub mod statement;
pub mod stub;
pub mod types;

pub use config::GatewayConfig;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use pool::{Connection, ConnectionPool};
pub use statement::{classify, StatementKind};
pub use types::{FieldInfo, QueryOutcome};
