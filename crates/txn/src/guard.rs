//! The release guard.

use txgate_core::Connection;

/// Returns a connection to its pool, swallowing failure.
///
/// Contract: a no-op when `conn` is `None`; any release error is logged at
/// warn level and never propagated. Cleanup paths call this so their own
/// control flow cannot be disrupted by a release failure.
pub async fn release_quietly(conn: Option<&dyn Connection>) {
    let Some(conn) = conn else {
        return;
    };
    if let Err(err) = conn.release().await {
        tracing::warn!(error = %err, "connection release failed, continuing");
    }
}
