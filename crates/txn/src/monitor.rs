//! The timeout monitor.
//!
//! A cancellable periodic task that sweeps the registry and force-rolls
//! back transactions staged longer than the configured timeout. The task
//! holds only a weak reference to its registry, so it can never keep the
//! registry (or the process) alive; `stop` aborts it outright and is called
//! by `destroy` before the final shutdown sweep so no tick can race it.

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::registry::TransactionRegistry;

/// Periodic sweep handle owned by the registry.
pub struct TimeoutMonitor {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TimeoutMonitor {
    /// Creates a stopped monitor.
    pub(crate) fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Spawns the sweep loop. A no-op if already running.
    ///
    /// Must be called on a Tokio runtime. The loop exits on its own once
    /// the registry is dropped.
    pub(crate) fn start(
        &self,
        registry: Weak<TransactionRegistry>,
        interval: Duration,
        timeout: Duration,
    ) {
        let mut guard = self.handle.lock();
        if guard.is_some() {
            return;
        }
        tracing::debug!(?interval, ?timeout, "starting timeout monitor");
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately;
            // consume it so the first sweep happens a full interval in.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.sweep_expired(timeout).await;
            }
        });
        *guard = Some(handle);
    }

    /// Cancels the sweep loop. A no-op if not running.
    pub(crate) fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            tracing::debug!("timeout monitor stopped");
        }
    }

    /// Whether the sweep loop is currently spawned.
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }
}

impl Drop for TimeoutMonitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use txgate_core::stub::StubConnection;
    use txgate_core::{Connection, GatewayConfig};

    use crate::registry::TransactionRegistry;

    fn monitored_registry(timeout_ms: u64, interval_ms: u64) -> Arc<TransactionRegistry> {
        let config = GatewayConfig::builder()
            .transaction_timeout_ms(timeout_ms)
            .monitor_interval_ms(interval_ms)
            .monitor_enabled(true)
            .build();
        let registry = TransactionRegistry::new(&config);
        registry.start_monitor();
        registry
    }

    async fn stage(registry: &TransactionRegistry, id: &str) -> Arc<StubConnection> {
        let conn = StubConnection::new();
        conn.execute("BEGIN").await.unwrap();
        registry
            .add(id.into(), conn.clone(), "update t set x = 1", None)
            .await
            .unwrap();
        conn
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_transaction_is_rolled_back_without_caller_action() {
        let registry = monitored_registry(100, 50);
        let conn = stage(&registry, "tx1").await;

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        assert!(!registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("ROLLBACK"), 1);
        assert_eq!(conn.release_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_transaction_survives_the_sweep() {
        let registry = monitored_registry(10_000, 50);
        let conn = stage(&registry, "tx1").await;

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        assert!(registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("ROLLBACK"), 0);
        assert_eq!(conn.release_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_monitor_never_sweeps() {
        let config = GatewayConfig::builder()
            .transaction_timeout_ms(10)
            .monitor_interval_ms(10)
            .monitor_enabled(false)
            .build();
        let registry = TransactionRegistry::new(&config);
        registry.start_monitor();
        let conn = stage(&registry, "tx1").await;

        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        assert!(registry.has(&"tx1".into()));
        assert_eq!(conn.count_containing("ROLLBACK"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_the_monitor_before_the_final_sweep() {
        let registry = monitored_registry(100, 50);
        let conn = stage(&registry, "tx1").await;

        let failures = registry.destroy().await;
        assert_eq!(failures, 0);
        assert!(!registry.has(&"tx1".into()));
        // The shutdown sweep, not a later tick, rolled it back.
        assert_eq!(conn.count_containing("ROLLBACK"), 1);

        // With the monitor stopped, time passing changes nothing.
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        assert_eq!(conn.count_containing("ROLLBACK"), 1);
    }
}
