//! Read-side ports for persisted data.
//!
//! Handlers only see these traits; the SQLite pool implements both (see
//! `db.rs`), and tests swap in in-memory fakes.

use async_trait::async_trait;

use crate::models::{Record, Settings, TimeWindow};

/// Per-client time series of telemetry records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records for `client` whose timestamp falls inside `window`,
    /// oldest first.
    async fn query(&self, client: &str, window: TimeWindow) -> anyhow::Result<Vec<Record>>;
}

/// Process-wide settings, owned outside the handlers.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn settings(&self) -> anyhow::Result<Settings>;
}
