use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use chrono::Utc;

use super::RecordStore;
use crate::{db::HistoryRecord, Error, Result};

#[derive(Default)]
struct Log {
    records: Vec<HistoryRecord>,
    last_id: i64,
    schema_ready: bool,
}

/// Volatile store with the same ordering and id rules as the SQLite one.
/// Writes can be made to fail on demand to exercise degraded paths.
#[derive(Default)]
pub struct MemoryRecordStore {
    log: Mutex<Log>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `append`/`purge_all` fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        match self.log.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_writable(&self, log: &Log) -> Result<()> {
        if !log.schema_ready {
            return Err(Error::StorageWrite("schema has not been created".into()));
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageWrite("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.lock().schema_ready = true;
        Ok(())
    }

    async fn append(&self, species_label: &str, confidence: f64) -> Result<HistoryRecord> {
        let mut log = self.lock();
        self.check_writable(&log)?;

        log.last_id += 1;
        let record = HistoryRecord {
            id: log.last_id,
            species_label: species_label.to_string(),
            confidence,
            created_at: Utc::now(),
        };
        log.records.push(record.clone());
        Ok(record)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let log = self.lock();
        if !log.schema_ready {
            return Err(Error::StorageRead("schema has not been created".into()));
        }

        let mut records = log.records.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn purge_all(&self) -> Result<()> {
        let mut log = self.lock();
        self.check_writable(&log)?;
        log.records.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.lock().records.len())
    }
}
