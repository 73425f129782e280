//! Durable identification log.
//!
//! [`RecordStore`] is the capability the rest of the core sees. The SQLite
//! [`Database`] is the production implementation; [`MemoryRecordStore`] backs
//! tests and hosts without a writable disk.

pub mod memory;

pub use memory::MemoryRecordStore;

use async_trait::async_trait;
use log::warn;

use crate::{
    db::{Database, HistoryRecord},
    error::describe,
    Error, Result,
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Creates the schema if needed. A no-op when it already exists.
    async fn ensure_schema(&self) -> Result<()>;

    /// Stores one prediction with the next id and the current time.
    /// Raises `StorageWrite` when the row was not durably written.
    async fn append(&self, species_label: &str, confidence: f64) -> Result<HistoryRecord>;

    /// Newest first (ties by id, newest first), at most `limit` rows.
    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>>;

    /// Removes every record, all or nothing.
    async fn purge_all(&self) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl RecordStore for Database {
    async fn ensure_schema(&self) -> Result<()> {
        Database::ensure_schema(self)
            .await
            .map_err(|err| Error::StorageWrite(describe(&err)))
    }

    async fn append(&self, species_label: &str, confidence: f64) -> Result<HistoryRecord> {
        self.insert_prediction(species_label.to_string(), confidence)
            .await
            .map_err(|err| {
                warn!("Failed to append '{species_label}': {err:#}");
                Error::StorageWrite(describe(&err))
            })
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.list_recent_predictions(limit)
            .await
            .map_err(|err| Error::StorageRead(describe(&err)))
    }

    async fn purge_all(&self) -> Result<()> {
        let removed = self
            .delete_all_predictions()
            .await
            .map_err(|err| Error::StorageWrite(describe(&err)))?;
        log::info!("Purged {removed} history records");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.count_predictions()
            .await
            .map_err(|err| Error::StorageRead(describe(&err)))
    }
}
