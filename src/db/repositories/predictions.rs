use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_timestamp, parse_timestamp, to_i64},
    models::HistoryRecord,
    Database,
};

fn row_to_record(row: &Row) -> Result<HistoryRecord> {
    let timestamp: String = row.get("timestamp")?;

    Ok(HistoryRecord {
        id: row.get("id")?,
        species_label: row.get("species")?,
        confidence: row.get("confidence")?,
        created_at: parse_timestamp(&timestamp, "timestamp")?,
    })
}

impl Database {
    /// Inserts one prediction and returns the stored row.
    pub async fn insert_prediction(
        &self,
        species_label: String,
        confidence: f64,
    ) -> Result<HistoryRecord> {
        self.execute(move |conn| {
            let created_at = Utc::now();
            let tx = conn
                .transaction()
                .context("failed to open insert transaction")?;

            tx.execute(
                "INSERT INTO predictions (species, confidence, timestamp)
                 VALUES (?1, ?2, ?3)",
                params![species_label, confidence, format_timestamp(&created_at)],
            )
            .context("failed to insert prediction")?;
            let id = tx.last_insert_rowid();

            let record = tx
                .query_row(
                    "SELECT id, species, confidence, timestamp FROM predictions WHERE id = ?1",
                    params![id],
                    |row| Ok(row_to_record(row)),
                )
                .context("failed to read back inserted prediction")??;

            tx.commit().context("failed to commit prediction")?;
            Ok(record)
        })
        .await
    }

    /// Most recent first; equal timestamps fall back to the higher id.
    /// `julianday` puts RFC 3339 rows and column-default rows on one scale.
    pub async fn list_recent_predictions(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = to_i64(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, species, confidence, timestamp
                 FROM predictions
                 ORDER BY julianday(timestamp) DESC, id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }

            Ok(records)
        })
        .await
    }

    /// Deletes every prediction in a single transaction.
    pub async fn delete_all_predictions(&self) -> Result<usize> {
        self.execute(|conn| {
            let tx = conn
                .transaction()
                .context("failed to open purge transaction")?;
            let removed = tx
                .execute("DELETE FROM predictions", [])
                .context("failed to delete predictions")?;
            tx.commit().context("failed to commit purge")?;
            Ok(removed)
        })
        .await
    }

    pub async fn count_predictions(&self) -> Result<usize> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;
            usize::try_from(count).map_err(|_| anyhow!("negative row count {count}"))
        })
        .await
    }
}
