//! Gateway configuration.
//!
//! All values are optional with stated defaults and can be supplied three
//! ways: programmatically via the builder, from serialized form (serde), or
//! from `TXGATE_*` environment variables via [`GatewayConfig::from_env`].
//! Unparsable environment values are logged and fall back to the default
//! rather than failing startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// How long a staged transaction may stay open before the timeout
    /// monitor rolls it back, in milliseconds.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,

    /// How often the timeout monitor scans the registry, in milliseconds.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Whether the timeout monitor runs at all.
    #[serde(default = "default_monitor_enabled")]
    pub monitor_enabled: bool,

    /// Ceiling on concurrently staged write transactions.
    #[serde(default = "default_max_concurrent_transactions")]
    pub max_concurrent_transactions: usize,

    /// Maximum connections the pool may hand out. Passed through to the
    /// pool implementation; the gateway does not enforce it itself.
    #[serde(default = "default_pool_max_connections")]
    pub pool_max_connections: usize,

    /// Idle-eviction duration for pooled connections, in milliseconds.
    /// Passed through to the pool implementation.
    #[serde(default = "default_pool_idle_timeout_ms")]
    pub pool_idle_timeout_ms: u64,

    /// Per-statement timeout enforced at the pool layer, in milliseconds.
    /// Passed through to the pool implementation.
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

fn default_transaction_timeout_ms() -> u64 {
    15_000
}

fn default_monitor_interval_ms() -> u64 {
    5_000
}

fn default_monitor_enabled() -> bool {
    true
}

fn default_max_concurrent_transactions() -> usize {
    10
}

fn default_pool_max_connections() -> usize {
    20
}

fn default_pool_idle_timeout_ms() -> u64 {
    30_000
}

fn default_statement_timeout_ms() -> u64 {
    30_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: default_transaction_timeout_ms(),
            monitor_interval_ms: default_monitor_interval_ms(),
            monitor_enabled: default_monitor_enabled(),
            max_concurrent_transactions: default_max_concurrent_transactions(),
            pool_max_connections: default_pool_max_connections(),
            pool_idle_timeout_ms: default_pool_idle_timeout_ms(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `TXGATE_*` environment variables.
    ///
    /// Unset variables keep their defaults. Values that fail to parse are
    /// logged at warn level and keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        read_env("TXGATE_TRANSACTION_TIMEOUT_MS", &mut config.transaction_timeout_ms);
        read_env("TXGATE_MONITOR_INTERVAL_MS", &mut config.monitor_interval_ms);
        read_env("TXGATE_MONITOR_ENABLED", &mut config.monitor_enabled);
        read_env(
            "TXGATE_MAX_CONCURRENT_TRANSACTIONS",
            &mut config.max_concurrent_transactions,
        );
        read_env("TXGATE_POOL_MAX_CONNECTIONS", &mut config.pool_max_connections);
        read_env("TXGATE_POOL_IDLE_TIMEOUT_MS", &mut config.pool_idle_timeout_ms);
        read_env("TXGATE_STATEMENT_TIMEOUT_MS", &mut config.statement_timeout_ms);
        config
    }

    /// Transaction timeout as a [`Duration`].
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transaction_timeout_ms)
    }

    /// Monitor interval as a [`Duration`].
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    /// Idle-eviction duration as a [`Duration`].
    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_idle_timeout_ms)
    }

    /// Per-statement timeout as a [`Duration`].
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }

    /// Creates a builder for configuration.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }
}

fn read_env<T: std::str::FromStr>(key: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *slot = value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "unparsable environment value, keeping default");
            }
        }
    }
}

/// Builder for gateway configuration.
#[derive(Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
        }
    }

    /// Sets the transaction timeout in milliseconds.
    pub fn transaction_timeout_ms(mut self, ms: u64) -> Self {
        self.config.transaction_timeout_ms = ms;
        self
    }

    /// Sets the monitor interval in milliseconds.
    pub fn monitor_interval_ms(mut self, ms: u64) -> Self {
        self.config.monitor_interval_ms = ms;
        self
    }

    /// Enables or disables the timeout monitor.
    pub fn monitor_enabled(mut self, enabled: bool) -> Self {
        self.config.monitor_enabled = enabled;
        self
    }

    /// Sets the ceiling on concurrently staged transactions.
    pub fn max_concurrent_transactions(mut self, max: usize) -> Self {
        self.config.max_concurrent_transactions = max;
        self
    }

    /// Sets the maximum pool connection count.
    pub fn pool_max_connections(mut self, max: usize) -> Self {
        self.config.pool_max_connections = max;
        self
    }

    /// Sets the pool idle-eviction duration in milliseconds.
    pub fn pool_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.pool_idle_timeout_ms = ms;
        self
    }

    /// Sets the per-statement timeout in milliseconds.
    pub fn statement_timeout_ms(mut self, ms: u64) -> Self {
        self.config.statement_timeout_ms = ms;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> GatewayConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.transaction_timeout_ms, 15_000);
        assert_eq!(config.monitor_interval_ms, 5_000);
        assert!(config.monitor_enabled);
        assert_eq!(config.max_concurrent_transactions, 10);
        assert_eq!(config.pool_max_connections, 20);
        assert_eq!(config.pool_idle_timeout_ms, 30_000);
        assert_eq!(config.statement_timeout_ms, 30_000);
    }

    #[test]
    fn test_builder() {
        let config = GatewayConfig::builder()
            .transaction_timeout_ms(1_000)
            .monitor_enabled(false)
            .max_concurrent_transactions(3)
            .build();

        assert_eq!(config.transaction_timeout_ms, 1_000);
        assert!(!config.monitor_enabled);
        assert_eq!(config.max_concurrent_transactions, 3);
        // Untouched fields keep defaults
        assert_eq!(config.pool_max_connections, 20);
    }

    #[test]
    fn test_durations() {
        let config = GatewayConfig::builder().transaction_timeout_ms(250).build();
        assert_eq!(config.transaction_timeout(), Duration::from_millis(250));
        assert_eq!(config.monitor_interval(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.transaction_timeout_ms, 15_000);

        let config: GatewayConfig =
            serde_json::from_str(r#"{"monitor_enabled": false}"#).unwrap();
        assert!(!config.monitor_enabled);
        assert_eq!(config.monitor_interval_ms, 5_000);
    }
}
