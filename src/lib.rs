//! Gauge - Telemetry HTTP Facade
//!
//! A thin HTTP read/write facade over a time-series telemetry store.
//! Values are keyed by component and parameter names; reads are either
//! point-in-time ("latest") or windowed ("last N hours/minutes"), and
//! the single permitted remote write updates the drive controller's
//! state machine state.
//!
//! The `gauge` binary runs the service; everything it uses is exported
//! here for embedding in other programs and for the integration tests.
//!
//! # Architecture
//!
//! - **Server**: Axum router mapping HTTP requests to store operations
//! - **Query**: Relative-time token parsing and window threshold math
//! - **Storage**: Pooled SQLite persistence with a stream catalog
//! - **Config**: YAML configuration with CLI/env overrides

pub mod config;
pub mod query;
pub mod server;
pub mod storage;

pub use config::AppConfig;
pub use query::QueryMode;
pub use server::{AppState, create_router};
pub use storage::{
    ScalarValue, StorageBuilder, StorageHandles, StoreError, TelemetryRecord, TelemetryStore,
};
