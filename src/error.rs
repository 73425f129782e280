//! Crate-wide error type.
//!
//! Every user-facing operation funnels into [`Error`]. The storage layer keeps
//! `anyhow` internally and is rendered into `StorageWrite`/`StorageRead` at the
//! [`RecordStore`](crate::store::RecordStore) boundary.

use thiserror::Error;

use crate::{init::InitStep, screen::Screen};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The capture device or gallery picker could not produce an image.
    #[error("capture failed: {0}")]
    Capture(String),

    /// `classify` was called before the classifier reported ready.
    #[error("classifier is not ready")]
    ClassifierUnavailable,

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("storage read failed: {0}")]
    StorageRead(String),

    /// The run classified successfully but the top prediction was not saved.
    #[error("result could not be saved: {0}")]
    Persistence(String),

    #[error("an identification is already in progress")]
    PipelineBusy,

    #[error("startup failed at {step}: {message}")]
    Initialization { step: InitStep, message: String },

    #[error("cannot {action} from the {from} screen")]
    InvalidTransition { from: Screen, action: &'static str },

    #[error("screen change is blocked while an identification is running")]
    TransitionBlocked,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Errors that end a single run without affecting the rest of the app.
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            Error::Capture(_) | Error::Classification(_) | Error::Persistence(_)
        )
    }
}

/// Renders an `anyhow` chain into a single line, keeping every context layer.
pub(crate) fn describe(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
