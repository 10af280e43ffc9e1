//! Transaction lifecycle core for txgate.
//!
//! This crate owns the staged-transaction registry and everything that
//! terminates a staged transaction:
//!
//! - [`TransactionRegistry`] — the single point of truth for which
//!   transactions are open and which pooled connections they own
//! - [`TimeoutMonitor`] — a cancellable periodic sweep that force-rolls
//!   back transactions left open past the configured timeout
//! - [`TxId`] — opaque, loggable transaction tokens
//! - [`release_quietly`] — the idempotent, failure-swallowing release
//!   guard every cleanup path goes through
//!
//! The guarantee that ties these together: each pooled connection owned by
//! a registry entry is returned to its pool exactly once, no matter which
//! path finalizes the transaction (explicit commit, explicit rollback,
//! timeout, or shutdown).

mod guard;
mod id;
mod monitor;
mod registry;

pub use guard::release_quietly;
pub use id::TxId;
pub use monitor::TimeoutMonitor;
pub use registry::{Initiator, TransactionInfo, TransactionRegistry, TxState};
