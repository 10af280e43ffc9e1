//! Main entry point for txgate.
//!
//! [`Gateway`] wires the injected connection pool, the transaction
//! registry (with its timeout monitor), and the staged execution protocol
//! into the four-operation surface callers see. Every operation returns an
//! [`Envelope`]; handler errors are converted at this boundary and nothing
//! escapes to crash the process.

use std::sync::Arc;

use txgate_core::{ConnectionPool, Envelope, Error, GatewayConfig};
use txgate_executor::StagedExecutor;
use txgate_txn::{TransactionRegistry, TxId};

/// The transaction gateway.
///
/// Create one with [`Gateway::builder`], supplying the connection pool the
/// deployment uses. Must be built on a Tokio runtime: the timeout monitor
/// is spawned during construction (unless disabled by configuration).
///
/// # Example
///
/// ```ignore
/// let gateway = Gateway::builder()
///     .pool(pool)
///     .config(GatewayConfig::from_env())
///     .build();
///
/// let reply = gateway.run_write("insert into t values (1)").await;
/// ```
pub struct Gateway {
    executor: StagedExecutor,
    registry: Arc<TransactionRegistry>,
    config: GatewayConfig,
}

impl Gateway {
    /// Creates a builder.
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// The configuration this gateway runs with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Number of currently staged transactions.
    pub fn active_transactions(&self) -> usize {
        self.registry.count()
    }

    /// Executes a read-only statement.
    ///
    /// Rejects non-read-only text; otherwise runs the statement inside an
    /// immediately committed read-only transaction and returns its rows.
    pub async fn run_read_only(&self, sql: &str) -> Envelope {
        match self.executor.execute_read_only(sql).await {
            Ok(outcome) => match serde_json::to_value(&outcome) {
                Ok(data) => Envelope::success(data),
                Err(err) => Envelope::from(Error::Internal(err.to_string())),
            },
            Err(err) => Envelope::from(err),
        }
    }

    /// Stages a write statement.
    ///
    /// Rejects read-only text and enforces the concurrency ceiling, then
    /// opens a transaction, executes the statement, and returns the
    /// transaction id without committing. The transaction stays open until
    /// [`Gateway::commit`], [`Gateway::rollback`], the timeout monitor, or
    /// [`Gateway::shutdown`] finalizes it.
    pub async fn run_write(&self, sql: &str) -> Envelope {
        match self.executor.execute_write(sql).await {
            Ok(staged) => Envelope::success_with_message(
                "transaction staged; commit or rollback with this id to finalize",
                serde_json::json!({
                    "transaction_id": staged.id,
                    "command": staged.outcome.command,
                    "row_count": staged.outcome.row_count,
                    "elapsed_ms": staged.elapsed.as_millis() as u64,
                }),
            ),
            Err(err) => Envelope::from(err),
        }
    }

    /// Finalizes a staged transaction with `COMMIT`.
    pub async fn commit(&self, id: &str) -> Envelope {
        let id = TxId::from(id);
        match self.executor.commit(&id).await {
            Ok(()) => Envelope::success_with_message(
                "transaction committed",
                serde_json::json!({ "transaction_id": id }),
            ),
            Err(err) => Envelope::from(err),
        }
    }

    /// Finalizes a staged transaction with `ROLLBACK`.
    pub async fn rollback(&self, id: &str) -> Envelope {
        let id = TxId::from(id);
        match self.executor.rollback(&id).await {
            Ok(()) => Envelope::success_with_message(
                "transaction rolled back",
                serde_json::json!({ "transaction_id": id }),
            ),
            Err(err) => Envelope::from(err),
        }
    }

    /// Gracefully shuts the gateway down.
    ///
    /// Stops the timeout monitor and rolls back every staged transaction,
    /// so the pool can be closed afterwards. Teardown always completes;
    /// individual rollback failures are reported in a warning envelope
    /// rather than raised.
    pub async fn shutdown(&self) -> Envelope {
        let open = self.registry.count();
        tracing::info!(open_transactions = open, "gateway shutting down");
        let failures = self.registry.destroy().await;
        let data = serde_json::json!({ "rolled_back": open });
        if failures > 0 {
            Envelope::warning(
                format!("{failures} of {open} shutdown rollbacks failed"),
                data,
            )
        } else {
            Envelope::success_with_message("shutdown complete", data)
        }
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    pool: Option<Arc<dyn ConnectionPool>>,
    config: GatewayConfig,
}

impl GatewayBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self {
            pool: None,
            config: GatewayConfig::default(),
        }
    }

    /// Sets the connection pool the gateway executes on. Required.
    pub fn pool(mut self, pool: Arc<dyn ConnectionPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the configuration. Defaults to [`GatewayConfig::default`].
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the gateway and starts the timeout monitor (if enabled).
    ///
    /// Must be called on a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if no pool was supplied; the gateway is unusable without
    /// one, and this is a wiring error at startup, not a runtime
    /// condition.
    pub fn build(self) -> Gateway {
        let pool = self.pool.expect("GatewayBuilder::pool is required");
        let registry = TransactionRegistry::new(&self.config);
        registry.start_monitor();
        let executor = StagedExecutor::new(pool, registry.clone(), &self.config);
        Gateway {
            executor,
            registry,
            config: self.config,
        }
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
