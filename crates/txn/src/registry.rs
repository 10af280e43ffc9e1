//! The transaction registry.
//!
//! The registry is the single point of truth for which transactions are
//! open and uncommitted, and the single owner of the pooled connections
//! those transactions hold. Nothing else may release a staged connection;
//! nothing but the write-staging step may insert here.
//!
//! ## Terminal exclusivity
//!
//! For any id, at most one of commit, explicit rollback, timeout rollback,
//! or shutdown rollback issues the terminal database command. The winner is
//! whichever path flips the entry to [`TxState::Terminating`] first; the
//! flip happens under the registry lock, before the terminal statement is
//! issued. Losers observe the entry as already claimed: commit reports
//! `NotFound`, rollback returns silently.
//!
//! ## Exactly-once release
//!
//! `remove` takes the entry out of the map before releasing, so a second
//! removal finds nothing and a double release is unrepresentable. The lock
//! is never held across an await: terminal paths clone the connection
//! handle under the lock, issue the terminal statement, then remove.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

use txgate_core::{Connection, Error, GatewayConfig, Result};

use crate::guard::release_quietly;
use crate::id::TxId;
use crate::monitor::TimeoutMonitor;

/// Lifecycle state of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Staged and awaiting a terminal decision.
    Active,
    /// A terminal path has claimed this transaction; the terminal command
    /// is being (or has been) issued.
    Terminating,
}

/// Which path initiated a rollback. Logged for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    /// Explicit rollback call from the caller.
    User,
    /// The timeout monitor.
    Automatic,
    /// Registry teardown.
    Shutdown,
}

impl Initiator {
    /// Stable string form used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Initiator::User => "user",
            Initiator::Automatic => "automatic",
            Initiator::Shutdown => "shutdown",
        }
    }
}

/// A diagnostic snapshot of one registry entry.
#[derive(Debug, Clone)]
pub struct TransactionInfo {
    /// The transaction token.
    pub id: TxId,
    /// Original statement text, retained for diagnostics only.
    pub sql: String,
    /// Current lifecycle state.
    pub state: TxState,
    /// How long the transaction has been staged.
    pub age: Duration,
}

/// One open, uncommitted transaction bound to a checked-out connection.
struct TrackedTransaction {
    conn: Arc<dyn Connection>,
    sql: String,
    started_at: Instant,
    state: TxState,
    /// Admission permit; dropping it (on removal) returns capacity to the
    /// concurrency ceiling.
    _permit: Option<OwnedSemaphorePermit>,
}

/// Registry of in-flight staged transactions.
pub struct TransactionRegistry {
    entries: Mutex<HashMap<TxId, TrackedTransaction>>,
    monitor: TimeoutMonitor,
    transaction_timeout: Duration,
    monitor_interval: Duration,
    monitor_enabled: bool,
}

impl TransactionRegistry {
    /// Creates a registry. The timeout monitor is not started; call
    /// [`TransactionRegistry::start_monitor`] from within a Tokio runtime.
    pub fn new(config: &GatewayConfig) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            monitor: TimeoutMonitor::new(),
            transaction_timeout: config.transaction_timeout(),
            monitor_interval: config.monitor_interval(),
            monitor_enabled: config.monitor_enabled,
        })
    }

    /// Starts the timeout monitor, if enabled by configuration.
    ///
    /// Must be called on a Tokio runtime. Idempotent: a second call while
    /// the monitor is running does nothing.
    pub fn start_monitor(self: &Arc<Self>) {
        if !self.monitor_enabled {
            tracing::debug!("timeout monitor disabled by configuration");
            return;
        }
        self.monitor.start(
            Arc::downgrade(self),
            self.monitor_interval,
            self.transaction_timeout,
        );
    }

    /// Inserts a new entry for a transaction that has already had `BEGIN`
    /// issued on `conn`.
    ///
    /// `permit`, when present, is the admission permit that reserved this
    /// entry's slot under the concurrency ceiling; it is held until the
    /// entry is removed.
    ///
    /// Duplicate ids are an invariant violation (token generation is the
    /// caller's responsibility): the incoming connection is released via
    /// the guard and `Internal` is returned, never a silent overwrite.
    pub async fn add(
        &self,
        id: TxId,
        conn: Arc<dyn Connection>,
        sql: &str,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<()> {
        {
            let mut entries = self.entries.lock();
            if !entries.contains_key(&id) {
                tracing::debug!(id = %id, sql, "transaction staged");
                entries.insert(
                    id,
                    TrackedTransaction {
                        conn,
                        sql: sql.to_string(),
                        started_at: Instant::now(),
                        state: TxState::Active,
                        _permit: permit,
                    },
                );
                return Ok(());
            }
        }
        tracing::error!(id = %id, "duplicate transaction id, refusing to overwrite");
        release_quietly(Some(conn.as_ref())).await;
        Err(Error::Internal(format!("duplicate transaction id: {id}")))
    }

    /// Whether `id` is currently tracked.
    pub fn has(&self, id: &TxId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Diagnostic snapshot of one entry, if present.
    pub fn get(&self, id: &TxId) -> Option<TransactionInfo> {
        let entries = self.entries.lock();
        entries.get(id).map(|entry| TransactionInfo {
            id: id.clone(),
            sql: entry.sql.clone(),
            state: entry.state,
            age: entry.started_at.elapsed(),
        })
    }

    /// Number of tracked transactions.
    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Snapshot of all tracked ids.
    pub fn ids(&self) -> Vec<TxId> {
        self.entries.lock().keys().cloned().collect()
    }

    /// Deletes the entry for `id` and returns its connection to the pool.
    ///
    /// Idempotent: absent ids are a no-op, and because the entry is taken
    /// out of the map before the release, the connection is released at
    /// most once across any number of calls.
    pub async fn remove(&self, id: &TxId) {
        let entry = self.entries.lock().remove(id);
        if let Some(entry) = entry {
            release_quietly(Some(entry.conn.as_ref())).await;
            tracing::debug!(id = %id, "transaction removed, connection released");
        }
        // Admission permit (if any) drops with the entry here.
    }

    /// Commits the transaction and removes it.
    ///
    /// Fails with `NotFound` when the id is absent or another terminal
    /// path has already claimed it. Whether `COMMIT` succeeds or fails,
    /// the entry is removed and the connection released before this
    /// returns; a commit failure is then reported as `Execution`.
    pub async fn commit_and_remove(&self, id: &TxId) -> Result<()> {
        let conn = {
            let mut entries = self.entries.lock();
            match entries.get_mut(id) {
                None => return Err(Error::NotFound { id: id.to_string() }),
                Some(entry) if entry.state == TxState::Terminating => {
                    return Err(Error::NotFound { id: id.to_string() })
                }
                Some(entry) => {
                    entry.state = TxState::Terminating;
                    Arc::clone(&entry.conn)
                }
            }
        };

        let outcome = conn.execute("COMMIT").await;
        self.remove(id).await;

        match outcome {
            Ok(_) => {
                tracing::info!(id = %id, "transaction committed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "commit failed, connection reclaimed");
                Err(Error::Execution(format!("commit failed for {id}: {err}")))
            }
        }
    }

    /// Rolls the transaction back and removes it.
    ///
    /// Tolerant by contract: an absent or already-claimed id returns
    /// silently, because timeout and shutdown sweeps may race an explicit
    /// terminal call. A `ROLLBACK` failure is logged, never propagated;
    /// the entry is removed and the connection released regardless.
    pub async fn rollback_and_remove(&self, id: &TxId, initiator: Initiator, reason: &str) {
        self.rollback_inner(id, initiator, reason).await;
    }

    /// Stops the monitor and rolls back everything still tracked.
    ///
    /// Per-transaction failures are independent: each is logged and never
    /// aborts the sweep of the rest. Returns how many rollback commands
    /// failed, so the caller can surface a warning. Used once, at process
    /// teardown.
    pub async fn destroy(&self) -> usize {
        self.monitor.stop();
        let ids = self.ids();
        if !ids.is_empty() {
            tracing::info!(count = ids.len(), "shutdown: rolling back staged transactions");
        }
        let mut failures = 0;
        for id in ids {
            if let RollbackOutcome::CommandFailed =
                self.rollback_inner(&id, Initiator::Shutdown, "registry shutting down").await
            {
                failures += 1;
            }
        }
        failures
    }

    /// Rolls back every transaction staged longer than `timeout`.
    ///
    /// Called by the timeout monitor on each tick, over a snapshot of ids
    /// so the sweep never iterates the map while mutating it.
    pub(crate) async fn sweep_expired(&self, timeout: Duration) {
        let expired: Vec<TxId> = {
            let entries = self.entries.lock();
            entries
                .iter()
                .filter(|(_, entry)| {
                    entry.state == TxState::Active && entry.started_at.elapsed() > timeout
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in expired {
            self.rollback_inner(&id, Initiator::Automatic, "timed out").await;
        }
    }

    async fn rollback_inner(
        &self,
        id: &TxId,
        initiator: Initiator,
        reason: &str,
    ) -> RollbackOutcome {
        let conn = {
            let mut entries = self.entries.lock();
            match entries.get_mut(id) {
                None => {
                    tracing::debug!(id = %id, initiator = initiator.as_str(), "rollback requested for unknown transaction");
                    return RollbackOutcome::NotFound;
                }
                Some(entry) if entry.state == TxState::Terminating => {
                    tracing::debug!(id = %id, initiator = initiator.as_str(), "transaction already terminating");
                    return RollbackOutcome::NotFound;
                }
                Some(entry) => {
                    entry.state = TxState::Terminating;
                    Arc::clone(&entry.conn)
                }
            }
        };

        tracing::info!(id = %id, initiator = initiator.as_str(), reason, "rolling back transaction");
        let outcome = match conn.execute("ROLLBACK").await {
            Ok(_) => RollbackOutcome::RolledBack,
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "rollback failed, connection reclaimed anyway");
                RollbackOutcome::CommandFailed
            }
        };
        self.remove(id).await;
        outcome
    }
}

enum RollbackOutcome {
    RolledBack,
    CommandFailed,
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;
    use txgate_core::stub::StubConnection;

    fn test_registry() -> Arc<TransactionRegistry> {
        let config = GatewayConfig::builder().monitor_enabled(false).build();
        TransactionRegistry::new(&config)
    }

    async fn stage(registry: &TransactionRegistry, id: &str) -> Arc<StubConnection> {
        let conn = StubConnection::new();
        conn.execute("BEGIN").await.unwrap();
        registry
            .add(id.into(), conn.clone(), "insert into t values (1)", None)
            .await
            .unwrap();
        conn
    }

    #[tokio::test]
    async fn test_add_and_lookups() {
        let registry = test_registry();
        assert_eq!(registry.count(), 0);
        assert!(!registry.has(&"tx1".into()));

        stage(&registry, "tx1").await;
        assert!(registry.has(&"tx1".into()));
        assert_eq!(registry.count(), 1);

        let info = registry.get(&"tx1".into()).unwrap();
        assert_eq!(info.sql, "insert into t values (1)");
        assert_eq!(info.state, TxState::Active);
    }

    #[tokio::test]
    async fn test_duplicate_add_releases_incoming_connection() {
        let registry = test_registry();
        let first = stage(&registry, "tx1").await;

        let second = StubConnection::new();
        let err = registry
            .add("tx1".into(), second.clone(), "delete from t", None)
            .await
            .unwrap_err();
        assert!(err.is_serious());

        // The original entry is untouched; the incoming connection went
        // back to the pool.
        assert_eq!(registry.get(&"tx1".into()).unwrap().sql, "insert into t values (1)");
        assert_eq!(second.release_count(), 1);
        assert_eq!(first.release_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent_and_releases_once() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;

        registry.remove(&"tx1".into()).await;
        registry.remove(&"tx1".into()).await;
        registry.remove(&"missing".into()).await;

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_unknown_id_is_not_found() {
        let registry = test_registry();
        let err = registry.commit_and_remove(&"nope".into()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_commit_issues_commit_and_releases_once() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;

        registry.commit_and_remove(&"tx1".into()).await.unwrap();

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("COMMIT"), 1);
        assert_eq!(conn.count_containing("ROLLBACK"), 0);
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_still_removes_and_releases() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;
        conn.fail_on("COMMIT");

        let err = registry.commit_and_remove(&"tx1".into()).await.unwrap_err();
        assert_eq!(err.code(), "ExecutionError");

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_unknown_id_is_silent() {
        let registry = test_registry();
        registry
            .rollback_and_remove(&"nope".into(), Initiator::User, "rollback requested")
            .await;
    }

    #[tokio::test]
    async fn test_rollback_issues_rollback_and_releases_once() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;

        registry
            .rollback_and_remove(&"tx1".into(), Initiator::User, "rollback requested")
            .await;

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("ROLLBACK"), 1);
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_failure_is_swallowed_and_still_releases() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;
        conn.fail_on("ROLLBACK");

        registry
            .rollback_and_remove(&"tx1".into(), Initiator::User, "rollback requested")
            .await;

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_racing_finalizers_issue_one_terminal_command() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;

        // An explicit rollback racing a timeout-style rollback: exactly
        // one ROLLBACK reaches the connection.
        let id_a = "tx1".into();
        let id_b = "tx1".into();
        let a = registry.rollback_and_remove(&id_a, Initiator::User, "rollback requested");
        let b = registry.rollback_and_remove(&id_b, Initiator::Automatic, "timed out");
        tokio::join!(a, b);

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("ROLLBACK"), 1);
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_commit_racing_rollback_loser_observes_not_found() {
        let registry = test_registry();
        let conn = stage(&registry, "tx1").await;

        let registry2 = registry.clone();
        let rollback = tokio::spawn(async move {
            registry2
                .rollback_and_remove(&"tx1".into(), Initiator::Automatic, "timed out")
                .await;
        });
        rollback.await.unwrap();

        let err = registry.commit_and_remove(&"tx1".into()).await.unwrap_err();
        assert!(err.is_not_found());

        // Only the rollback issued a terminal command.
        assert_eq!(conn.count_containing("ROLLBACK"), 1);
        assert_eq!(conn.count_containing("COMMIT"), 0);
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test]
    async fn test_destroy_rolls_back_everything_despite_failures() {
        let registry = test_registry();
        let c1 = stage(&registry, "tx1").await;
        let c2 = stage(&registry, "tx2").await;
        let c3 = stage(&registry, "tx3").await;
        c2.fail_on("ROLLBACK");

        let failures = registry.destroy().await;

        assert_eq!(failures, 1);
        assert_eq!(registry.count(), 0);
        for conn in [&c1, &c2, &c3] {
            assert_eq!(conn.count_containing("ROLLBACK"), 1);
            assert_eq!(conn.release_count(), 1);
        }
    }

    #[tokio::test]
    async fn test_admission_permit_is_returned_on_removal() {
        use tokio::sync::Semaphore;

        let registry = test_registry();
        let limiter = Arc::new(Semaphore::new(1));
        let permit = limiter.clone().try_acquire_owned().unwrap();

        let conn = StubConnection::new();
        registry
            .add("tx1".into(), conn, "insert into t values (1)", Some(permit))
            .await
            .unwrap();
        assert_eq!(limiter.available_permits(), 0);

        registry.remove(&"tx1".into()).await;
        assert_eq!(limiter.available_permits(), 1);
    }
}
