pub mod app;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod db;
mod error;
pub mod init;
pub mod pipeline;
pub mod screen;
pub mod store;
pub mod utils;

use std::sync::Arc;

use log::info;

pub use app::{App, AppSnapshot};
pub use capture::{CaptureSource, FileImageSource, ImageHandle, ImageSource, PermissionGate};
pub use classifier::{Classifier, Prediction, Predictions, SimulatedClassifier, TOP_K};
pub use config::AppConfig;
pub use db::{Database, HistoryRecord};
pub use error::{Error, Result};
pub use init::{InitStep, InitializationSequencer};
pub use pipeline::{IdentificationPipeline, PipelineRun, RunStatus};
pub use screen::{Screen, ScreenStateMachine};
pub use store::{MemoryRecordStore, RecordStore};

/// Runs the startup sequence against the given collaborators and, only if
/// every step succeeds, returns an app sitting on the Capture screen.
pub async fn bootstrap(
    config: &AppConfig,
    permission: Arc<dyn PermissionGate>,
    store: Arc<dyn RecordStore>,
    classifier: Arc<dyn Classifier>,
) -> Result<App> {
    config.validate()?;

    InitializationSequencer::new(permission, store.clone(), classifier.clone())
        .run()
        .await?;

    Ok(App::new(config, store, classifier))
}

/// Production wiring: SQLite at `config.database_path` and the simulated
/// classifier.
pub async fn start(config: AppConfig, permission: Arc<dyn PermissionGate>) -> Result<App> {
    utils::logging::init(config.debug);
    info!("LeafScan starting up...");

    let database = Database::open(config.database_path.clone()).map_err(|err| {
        Error::Initialization {
            step: InitStep::StorageSchema,
            message: format!("{err:#}"),
        }
    })?;
    let classifier = Arc::new(SimulatedClassifier::new(&config.classifier));

    bootstrap(&config, permission, Arc::new(database), classifier).await
}
