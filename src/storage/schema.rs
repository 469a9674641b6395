//! Database schema definitions.

use crate::storage::StoreError;
use crate::storage::db::StorePool;

/// SQL statement for creating the streams catalog table.
///
/// One row per known (component, parameter) pair. A pair "exists" for
/// read validation exactly when it has a row here; rows are created on
/// first write to the stream.
pub const STREAMS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS streams (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    component TEXT NOT NULL,
    parameter TEXT NOT NULL,
    UNIQUE (component, parameter)
);
"#;

/// SQL statement for creating the records table.
///
/// Append-only readings, denormalized by (component, parameter) so every
/// query is a single filtered scan over one stream. The `value` column
/// holds the JSON encoding of the scalar (string, integer, or float).
/// Timestamps are fixed-width ISO-8601 UTC strings, so lexicographic
/// comparison matches chronological order.
pub const RECORDS_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    component    TEXT NOT NULL,
    parameter    TEXT NOT NULL,
    display_name TEXT NOT NULL,
    category     TEXT NOT NULL,
    value        TEXT NOT NULL,
    unit         TEXT NOT NULL,
    timestamp    TEXT NOT NULL
);
"#;

/// Index covering both query shapes: latest (ORDER BY timestamp DESC
/// LIMIT 1) and window (timestamp > threshold, ascending).
pub const RECORDS_INDEX_DDL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_records_stream_timestamp
    ON records (component, parameter, timestamp);
"#;

/// Initialize the database schema.
///
/// Creates all necessary tables and indexes if they don't exist.
pub async fn init_schema(pool: &StorePool) -> Result<(), StoreError> {
    sqlx::query(STREAMS_TABLE_DDL).execute(pool.inner()).await?;
    sqlx::query(RECORDS_TABLE_DDL).execute(pool.inner()).await?;
    sqlx::query(RECORDS_INDEX_DDL).execute(pool.inner()).await?;

    tracing::info!("Database schema initialized");
    Ok(())
}
