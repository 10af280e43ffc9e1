//! Statement classification.
//!
//! The gateway does not parse SQL. The only inspection it performs is the
//! read-only/write split that decides which execution mode a statement is
//! allowed to use: a statement whose first keyword is `SELECT`, `WITH`,
//! `EXPLAIN`, or `SHOW` is read-only; everything else (DML, DDL, DCL, TCL)
//! is a write.

/// The two execution modes a statement can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Runs inside an immediately committed read-only transaction.
    ReadOnly,
    /// Staged: runs inside a transaction left open for a later
    /// commit/rollback decision.
    Write,
}

impl StatementKind {
    /// Returns true for the read-only mode.
    pub fn is_read_only(&self) -> bool {
        matches!(self, StatementKind::ReadOnly)
    }
}

const READ_ONLY_KEYWORDS: [&str; 4] = ["select", "with", "explain", "show"];

/// Classifies a statement by its leading keyword.
///
/// Leading whitespace is ignored and the comparison is case-insensitive.
/// The keyword must end at a word boundary, so `withdrawal_audit(...)`
/// classifies as a write even though it starts with the letters `with`.
pub fn classify(sql: &str) -> StatementKind {
    let head = sql.trim_start().as_bytes();
    for keyword in READ_ONLY_KEYWORDS {
        let kw = keyword.as_bytes();
        if head.len() >= kw.len()
            && head[..kw.len()].eq_ignore_ascii_case(kw)
            && !head
                .get(kw.len())
                .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            return StatementKind::ReadOnly;
        }
    }
    StatementKind::Write
}
