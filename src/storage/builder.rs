//! Construction and lifecycle of the storage layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::StoreError;
use crate::storage::db::StorePool;
use crate::storage::schema::init_schema;
use crate::storage::store::TelemetryStore;

const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configures and opens the storage layer.
pub struct StorageBuilder {
    db_path: PathBuf,
    pool_size: u32,
    query_timeout: Duration,
}

impl StorageBuilder {
    /// Storage rooted at the given SQLite file.
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            pool_size: DEFAULT_POOL_SIZE,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Number of pooled connections.
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Deadline applied to each store operation.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Open the database, apply the schema and hand out the store.
    ///
    /// Missing parent directories of the database file are created
    /// first, so a fresh deployment can point at `data/gauge.db` without
    /// preparing the directory itself.
    pub async fn build(self) -> Result<StorageHandles, StoreError> {
        ensure_parent_dir(&self.db_path)?;

        let pool = StorePool::open(&self.db_path, self.pool_size).await?;
        init_schema(&pool).await?;

        let store = TelemetryStore::new(pool.clone(), self.query_timeout);
        Ok(StorageHandles { store, pool })
    }
}

fn ensure_parent_dir(db_path: &Path) -> Result<(), StoreError> {
    let Some(parent) = db_path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::Internal(format!("cannot create '{}': {e}", parent.display())))
}

/// Owner of the storage lifecycle.
///
/// The rest of the service only ever sees [`TelemetryStore`] clones;
/// the pool stays here so shutdown has a single place to drain it.
pub struct StorageHandles {
    /// Read/write facade handed to the HTTP layer.
    pub store: TelemetryStore,
    pool: StorePool,
}

impl StorageHandles {
    /// Wait for in-flight operations and close the pool.
    pub async fn shutdown(self) {
        self.pool.close().await;
    }
}
