//! Telemetry store facade.
//!
//! [`TelemetryStore`] is a cloneable handle over the shared connection
//! pool. Reads and the whitelisted write all go through it, and every
//! operation is bounded by a deadline so a wedged database turns into an
//! error response instead of a hung request.

use std::future::Future;
use std::time::Duration;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::storage::StoreError;
use crate::storage::db::StorePool;
use crate::storage::types::{ScalarValue, TelemetryRecord};

/// Read/write facade over the telemetry store.
#[derive(Clone)]
pub struct TelemetryStore {
    pool: StorePool,
    op_timeout: Duration,
}

impl std::fmt::Debug for TelemetryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStore").finish_non_exhaustive()
    }
}

impl TelemetryStore {
    pub(crate) fn new(pool: StorePool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Run a store operation under the configured deadline.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout))?
    }

    /// Check whether a (component, parameter) stream is in the catalog.
    pub async fn stream_exists(
        &self,
        component: &str,
        parameter: &str,
    ) -> Result<bool, StoreError> {
        self.bounded(async {
            let row = sqlx::query("SELECT 1 FROM streams WHERE component = $1 AND parameter = $2")
                .bind(component)
                .bind(parameter)
                .fetch_optional(self.pool.inner())
                .await?;
            Ok(row.is_some())
        })
        .await
    }

    /// The most recent record in a stream, or `None` when the stream has
    /// no records yet.
    pub async fn latest(
        &self,
        component: &str,
        parameter: &str,
    ) -> Result<Option<TelemetryRecord>, StoreError> {
        self.bounded(async {
            let row = sqlx::query(
                "SELECT display_name, category, value, unit, timestamp
                 FROM records
                 WHERE component = $1 AND parameter = $2
                 ORDER BY timestamp DESC
                 LIMIT 1",
            )
            .bind(component)
            .bind(parameter)
            .fetch_optional(self.pool.inner())
            .await?;

            Ok(row.as_ref().map(record_from_row).transpose()?)
        })
        .await
    }

    /// All records in a stream with `timestamp` strictly greater than
    /// `threshold`, oldest first.
    pub async fn records_since(
        &self,
        component: &str,
        parameter: &str,
        threshold: &str,
    ) -> Result<Vec<TelemetryRecord>, StoreError> {
        self.bounded(async {
            let rows = sqlx::query(
                "SELECT display_name, category, value, unit, timestamp
                 FROM records
                 WHERE component = $1 AND parameter = $2 AND timestamp > $3
                 ORDER BY timestamp ASC",
            )
            .bind(component)
            .bind(parameter)
            .bind(threshold)
            .fetch_all(self.pool.inner())
            .await?;

            let records = rows
                .iter()
                .map(record_from_row)
                .collect::<Result<Vec<_>, sqlx::Error>>()?;
            Ok(records)
        })
        .await
    }

    /// Append a record to a stream, registering the stream in the catalog
    /// on first write.
    ///
    /// Catalog upsert and record insert commit in one transaction, so a
    /// stream never appears in the catalog without its first record.
    pub async fn insert(
        &self,
        component: &str,
        parameter: &str,
        record: &TelemetryRecord,
    ) -> Result<(), StoreError> {
        let value = record.value.to_column()?;

        self.bounded(async {
            let mut tx = self.pool.inner().begin().await?;

            sqlx::query(
                "INSERT INTO streams (component, parameter) VALUES ($1, $2)
                 ON CONFLICT (component, parameter) DO NOTHING",
            )
            .bind(component)
            .bind(parameter)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO records
                     (component, parameter, display_name, category, value, unit, timestamp)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(component)
            .bind(parameter)
            .bind(&record.display_name)
            .bind(&record.category)
            .bind(&value)
            .bind(&record.unit)
            .bind(&record.timestamp)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    /// Verify the database answers queries.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(self.pool.inner()).await?;
            Ok(())
        })
        .await
    }
}

/// Map a result row to a record. The row id is never selected, so it
/// cannot leak into responses.
fn record_from_row(row: &SqliteRow) -> Result<TelemetryRecord, sqlx::Error> {
    let raw_value: String = row.try_get("value")?;

    Ok(TelemetryRecord {
        display_name: row.try_get("display_name")?,
        category: row.try_get("category")?,
        value: ScalarValue::from_column(&raw_value),
        unit: row.try_get("unit")?,
        timestamp: row.try_get("timestamp")?,
    })
}
