//! Staged execution protocol for txgate.
//!
//! [`StagedExecutor`] composes the pool seam, the identifier generator,
//! and the transaction registry into the four handlers the gateway
//! exposes: read-only execution, write staging, commit, and rollback.
//!
//! The two execution modes are mutually exclusive. The read path runs a
//! statement inside a read-only transaction and releases its connection
//! before returning. The write path opens a transaction, executes the
//! statement, and deliberately returns *without* committing or releasing:
//! the connection stays checked out, owned by the registry entry, until an
//! explicit commit or rollback call, the timeout monitor, or shutdown
//! finalizes it.

mod protocol;

pub use protocol::{StagedExecutor, StagedWrite};
