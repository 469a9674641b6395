//! Connection pool over the telemetry database file.
//!
//! Everything lives in one SQLite file. Connections are pooled through
//! sqlx and opened in WAL mode so concurrent readers never block the
//! writer.

use std::path::Path;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};

use crate::storage::StoreError;

/// How long a caller may wait for a free pooled connection.
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Pooled handle to the telemetry database file.
#[derive(Clone)]
pub struct StorePool {
    inner: SqlitePool,
}

impl std::fmt::Debug for StorePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePool").finish_non_exhaustive()
    }
}

impl StorePool {
    /// Open the database file, creating it when missing.
    ///
    /// The pool holds at most `max_connections` connections. Every
    /// connection runs with a WAL journal and `synchronous = NORMAL`.
    pub async fn open(path: impl AsRef<Path>, max_connections: u32) -> Result<Self, StoreError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), max_connections, "Opening telemetry database");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let inner = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(POOL_ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        Ok(Self { inner })
    }

    /// The raw sqlx pool, for executing queries against.
    #[inline]
    pub fn inner(&self) -> &SqlitePool {
        &self.inner
    }

    /// Wait for in-flight operations and close every connection.
    pub async fn close(&self) {
        self.inner.close().await;
    }

    /// Whether [`close`](Self::close) has completed.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
