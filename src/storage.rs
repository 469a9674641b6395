//! Storage Layer
//!
//! Pooled SQLite persistence with a document-store shape: a `streams`
//! catalog of known (component, parameter) pairs and an append-only
//! `records` table holding their readings.
//!
//! # Components
//!
//! - [`TelemetryStore`]: Read/write facade over the shared connection pool
//! - [`TelemetryRecord`] / [`ScalarValue`]: Stored record and its value union
//! - [`StorageBuilder`] / [`StorageHandles`]: Setup and shutdown

mod builder;
mod db;
mod error;
mod schema;
mod store;
mod types;

pub use builder::{StorageBuilder, StorageHandles};
pub use error::StoreError;
pub use store::TelemetryStore;
pub use types::{ScalarValue, TelemetryRecord};
