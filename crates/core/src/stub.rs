//! In-memory stand-ins for the pool seam.
//!
//! [`StubPool`] and [`StubConnection`] record every statement and every
//! release, and can be scripted to fail on chosen statements, so the test
//! suites of the other workspace crates can assert the exact database
//! traffic a code path produced without a live server.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::pool::{Connection, ConnectionPool};
use crate::types::QueryOutcome;

/// A scripted in-memory connection.
#[derive(Default)]
pub struct StubConnection {
    statements: Mutex<Vec<String>>,
    releases: AtomicUsize,
    fail_on: Mutex<Vec<String>>,
    fail_release: AtomicBool,
}

impl StubConnection {
    /// Creates a connection that accepts every statement.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes `execute` fail for any statement containing `needle`.
    pub fn fail_on(&self, needle: impl Into<String>) {
        self.fail_on.lock().push(needle.into());
    }

    /// Makes `release` fail.
    pub fn fail_release(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }

    /// Every statement executed on this connection, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Number of statements executed whose text contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.statements
            .lock()
            .iter()
            .filter(|s| s.contains(needle))
            .count()
    }

    /// How many times `release` has been called.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for StubConnection {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome> {
        self.statements.lock().push(sql.to_string());
        if self.fail_on.lock().iter().any(|n| sql.contains(n)) {
            return Err(Error::Execution(format!("scripted failure for: {sql}")));
        }
        let command = sql
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        Ok(QueryOutcome::command(command, 1, Duration::from_millis(0)))
    }

    async fn release(&self) -> Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(Error::Release("scripted release failure".into()));
        }
        Ok(())
    }
}

/// A pool that mints one fresh [`StubConnection`] per acquire.
#[derive(Default)]
pub struct StubPool {
    connections: Mutex<Vec<Arc<StubConnection>>>,
    acquires: AtomicUsize,
    fail_acquire: AtomicBool,
    fail_on: Mutex<Vec<String>>,
}

impl StubPool {
    /// Creates an empty pool.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes the next and all later `acquire` calls fail.
    pub fn fail_acquire(&self) {
        self.fail_acquire.store(true, Ordering::SeqCst);
    }

    /// Makes every connection this pool mints fail statements containing
    /// `needle`. Lets tests script failures on connections that do not
    /// exist yet.
    pub fn fail_on(&self, needle: impl Into<String>) {
        self.fail_on.lock().push(needle.into());
    }

    /// Every connection this pool has handed out, in acquire order.
    pub fn connections(&self) -> Vec<Arc<StubConnection>> {
        self.connections.lock().clone()
    }

    /// The most recently acquired connection.
    pub fn last_connection(&self) -> Option<Arc<StubConnection>> {
        self.connections.lock().last().cloned()
    }

    /// How many times `acquire` has been called.
    pub fn acquire_count(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionPool for StubPool {
    async fn acquire(&self) -> Result<Arc<dyn Connection>> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(Error::Execution("scripted acquire failure".into()));
        }
        let conn = StubConnection::new();
        for needle in self.fail_on.lock().iter() {
            conn.fail_on(needle.clone());
        }
        self.connections.lock().push(conn.clone());
        Ok(conn)
    }
}
