//! The read, write, commit, and rollback handlers.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Instant;

use txgate_core::{
    classify, Connection, ConnectionPool, Error, GatewayConfig, QueryOutcome, Result,
    StatementKind,
};
use txgate_txn::{release_quietly, Initiator, TransactionRegistry, TxId};

/// What write staging hands back to the caller: the token to finalize
/// with, plus the statement's own outcome and timing.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    /// Token for the later commit/rollback call.
    pub id: TxId,
    /// Outcome of the staged statement itself.
    pub outcome: QueryOutcome,
    /// Wall-clock time from admission to registration.
    pub elapsed: std::time::Duration,
}

/// Handlers for the staged execution protocol.
pub struct StagedExecutor {
    pool: Arc<dyn ConnectionPool>,
    registry: Arc<TransactionRegistry>,
    /// Admission ceiling for staged writes. The permit acquired here is
    /// stored in the registry entry, so check-and-stage cannot overshoot
    /// the ceiling even under parallel callers.
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
}

impl StagedExecutor {
    /// Creates the executor over an injected pool and registry.
    pub fn new(
        pool: Arc<dyn ConnectionPool>,
        registry: Arc<TransactionRegistry>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            pool,
            registry,
            limiter: Arc::new(Semaphore::new(config.max_concurrent_transactions)),
            max_concurrent: config.max_concurrent_transactions,
        }
    }

    /// The registry this executor stages into.
    pub fn registry(&self) -> &Arc<TransactionRegistry> {
        &self.registry
    }

    /// Executes a read-only statement to completion.
    ///
    /// Rejects non-read-only text with `Validation` before any connection
    /// is acquired. The statement runs inside an explicitly read-only
    /// transaction that commits immediately; the connection is released in
    /// all outcomes, and nothing is ever registered.
    pub async fn execute_read_only(&self, sql: &str) -> Result<QueryOutcome> {
        if classify(sql) != StatementKind::ReadOnly {
            return Err(Error::Validation {
                reason: "statement is not read-only; use the write operation".into(),
            });
        }

        let conn = self.pool.acquire().await?;
        let result = self.run_read_only(conn.as_ref(), sql).await;
        release_quietly(Some(conn.as_ref())).await;
        result
    }

    async fn run_read_only(&self, conn: &dyn Connection, sql: &str) -> Result<QueryOutcome> {
        conn.execute("BEGIN TRANSACTION READ ONLY").await?;
        match conn.execute(sql).await {
            Ok(outcome) => {
                conn.execute("COMMIT").await?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rb) = conn.execute("ROLLBACK").await {
                    tracing::warn!(error = %rb, "rollback after failed read-only statement failed");
                }
                Err(err)
            }
        }
    }

    /// Stages a write statement: opens a transaction, executes, registers,
    /// and returns without committing.
    ///
    /// Rejects read-only text with `Validation`. Admission happens first:
    /// at the concurrency ceiling the call fails with `ConcurrencyLimit`
    /// before any connection is acquired. On success the connection stays
    /// checked out, owned by the new registry entry.
    pub async fn execute_write(&self, sql: &str) -> Result<StagedWrite> {
        if classify(sql) == StatementKind::ReadOnly {
            return Err(Error::Validation {
                reason: "statement is read-only; use the read-only operation".into(),
            });
        }

        let permit = match self.limiter.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                return Err(Error::ConcurrencyLimit {
                    active: self.registry.count(),
                    max: self.max_concurrent,
                })
            }
        };

        let started = Instant::now();
        let conn = self.pool.acquire().await?;

        if let Err(err) = conn.execute("BEGIN").await {
            release_quietly(Some(conn.as_ref())).await;
            return Err(err);
        }

        let outcome = match conn.execute(sql).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(rb) = conn.execute("ROLLBACK").await {
                    tracing::warn!(error = %rb, "rollback after failed staged statement failed");
                }
                release_quietly(Some(conn.as_ref())).await;
                return Err(err);
            }
        };

        let id = TxId::generate();
        self.registry
            .add(id.clone(), conn, sql, Some(permit))
            .await?;

        Ok(StagedWrite {
            id,
            outcome,
            elapsed: started.elapsed(),
        })
    }

    /// Finalizes a staged transaction with `COMMIT`.
    ///
    /// `NotFound` with no side effects when the id is unknown.
    pub async fn commit(&self, id: &TxId) -> Result<()> {
        if !self.registry.has(id) {
            return Err(Error::NotFound { id: id.to_string() });
        }
        self.registry.commit_and_remove(id).await
    }

    /// Finalizes a staged transaction with `ROLLBACK`.
    ///
    /// `NotFound` with no side effects when the id is unknown. A rollback
    /// that loses the race against another finalizer also reports
    /// `NotFound`; a `ROLLBACK` command failure is best-effort and still
    /// counts as success (the connection is reclaimed either way).
    pub async fn rollback(&self, id: &TxId) -> Result<()> {
        if !self.registry.has(id) {
            return Err(Error::NotFound { id: id.to_string() });
        }
        self.registry
            .rollback_and_remove(id, Initiator::User, "rollback requested")
            .await;
        Ok(())
    }
}
