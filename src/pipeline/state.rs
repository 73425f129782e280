use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{capture::ImageHandle, classifier::Predictions, db::HistoryRecord, Error};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    #[default]
    Idle,
    Capturing,
    Classifying,
    Persisting,
    Done,
    Failed,
}

impl RunStatus {
    /// A run in one of these states holds the busy-guard.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::Capturing | RunStatus::Classifying | RunStatus::Persisting
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Failed)
    }
}

/// One capture → classify → persist attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub id: Uuid,
    pub status: RunStatus,
    pub image: Option<ImageHandle>,
    /// Set once classification succeeds; survives a persistence failure.
    pub result: Option<Predictions>,
    /// The saved top-1 row, present only when the run is `Done`.
    pub record: Option<HistoryRecord>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<Error>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

fn serialize_error<S>(error: &Option<Error>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: RunStatus::Idle,
            image: None,
            result: None,
            record: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn begin_capture(&mut self) {
        self.status = RunStatus::Capturing;
    }

    pub fn begin_classify(&mut self, image: ImageHandle) {
        self.image = Some(image);
        self.status = RunStatus::Classifying;
    }

    pub fn begin_persist(&mut self, result: Predictions) {
        self.result = Some(result);
        self.status = RunStatus::Persisting;
    }

    pub fn complete(&mut self, record: HistoryRecord) {
        self.record = Some(record);
        self.status = RunStatus::Done;
        self.finished_at = Some(Utc::now());
    }

    /// Terminates the run. Any result already obtained is kept.
    pub fn fail(&mut self, error: Error) {
        self.error = Some(error);
        self.status = RunStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Done with a result: the only outcome that may open the Results screen.
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Done && self.result.is_some()
    }
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}
