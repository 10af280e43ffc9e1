//! Result types returned by statement execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metadata for one column of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Column name.
    pub name: String,
    /// Database type name (e.g. `int4`, `text`).
    pub type_name: String,
}

impl FieldInfo {
    /// Creates a new field descriptor.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// The outcome of executing one statement on a connection.
///
/// This is the shape the pool collaborator hands back for every statement:
/// rows for queries, a row count and command tag for everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Command tag reported by the database (e.g. `SELECT`, `INSERT`).
    pub command: String,
    /// Number of rows returned or affected.
    pub row_count: u64,
    /// Result rows, one JSON object per row. Empty for non-queries.
    #[serde(default)]
    pub rows: Vec<serde_json::Value>,
    /// Column metadata. Empty for non-queries.
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
    /// Wall-clock execution time, reported as milliseconds on the wire.
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl QueryOutcome {
    /// Creates an outcome with no rows, for command statements.
    pub fn command(tag: impl Into<String>, row_count: u64, elapsed: Duration) -> Self {
        Self {
            command: tag.into(),
            row_count,
            rows: Vec::new(),
            fields: Vec::new(),
            elapsed,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
