//! The connection-pool seam.
//!
//! The pool itself is an external collaborator: something that hands out
//! exclusive database sessions, bounded in count, with idle eviction and a
//! per-statement timeout of its own. The gateway only depends on these two
//! traits. [`crate::stub`] provides in-memory implementations for tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::QueryOutcome;

/// One exclusive database session checked out of a pool.
///
/// A connection stays checked out for as long as the holder keeps the
/// handle. `release` returns it to its pool; implementations must make
/// release idempotent, and callers are expected to go through the release
/// guard (`release_quietly`) rather than calling it directly in cleanup
/// paths.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Executes one statement on this session.
    async fn execute(&self, sql: &str) -> Result<QueryOutcome>;

    /// Returns this session to its pool.
    async fn release(&self) -> Result<()>;
}

/// Hands out exclusive [`Connection`] handles.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Checks a connection out of the pool, suspending until one is
    /// available (bounded by the pool's own connection ceiling).
    async fn acquire(&self) -> Result<Arc<dyn Connection>>;
}
