use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted identification: the top prediction of a completed run.
/// Rows are append-only; they disappear only through a full purge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub species_label: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}
