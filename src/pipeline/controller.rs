use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, info, warn};
use tokio::sync::watch;
use uuid::Uuid;

use super::{PipelineRun, RunStatus};
use crate::{
    capture::{ImageHandle, ImageSource},
    classifier::{Classifier, Predictions},
    store::RecordStore,
    Error, Result,
};

const ABANDONED: &str = "run abandoned";

/// Drives one capture → classify → persist chain at a time.
///
/// The busy-guard is the held run's status: while it is `Capturing`,
/// `Classifying` or `Persisting`, a new [`identify`](Self::identify) call is
/// rejected with [`Error::PipelineBusy`] instead of being queued. A run whose
/// `identify` future is dropped or panics is failed on the way out, so the
/// guard is always released.
#[derive(Clone)]
pub struct IdentificationPipeline {
    classifier: Arc<dyn Classifier>,
    store: Arc<dyn RecordStore>,
    classify_timeout: Duration,
    current: Arc<Mutex<Option<PipelineRun>>>,
    updates: Arc<watch::Sender<Option<PipelineRun>>>,
}

impl IdentificationPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn RecordStore>,
        classify_timeout: Duration,
    ) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            classifier,
            store,
            classify_timeout,
            current: Arc::new(Mutex::new(None)),
            updates: Arc::new(updates),
        }
    }

    /// Receives every change of the held run, `None` once it is discarded.
    pub fn subscribe(&self) -> watch::Receiver<Option<PipelineRun>> {
        self.updates.subscribe()
    }

    pub async fn current(&self) -> Option<PipelineRun> {
        self.lock_current().clone()
    }

    pub async fn is_active(&self) -> bool {
        self.lock_current()
            .as_ref()
            .is_some_and(PipelineRun::is_active)
    }

    /// Runs a full identification from `source`.
    ///
    /// Returns the terminal run, `Done` or `Failed`; per-step failures are
    /// recorded on the run rather than returned. Only `PipelineBusy` is
    /// returned as an error.
    pub async fn identify(&self, source: &dyn ImageSource) -> Result<PipelineRun> {
        let mut run = {
            let mut current = self.lock_current();
            if current.as_ref().is_some_and(PipelineRun::is_active) {
                debug!("Rejecting {} capture: pipeline busy", source.kind().as_str());
                return Err(Error::PipelineBusy);
            }

            let mut run = PipelineRun::new();
            run.begin_capture();
            *current = Some(run.clone());
            run
        };
        let _guard = AbandonGuard {
            pipeline: self,
            run_id: run.id,
        };
        self.updates.send_replace(Some(run.clone()));
        info!("Run {} started from {}", run.id, source.kind().as_str());

        let image = match source.acquire_image().await {
            Ok(image) => image,
            Err(err) => {
                let err = match err {
                    Error::Capture(_) => err,
                    other => Error::Capture(other.to_string()),
                };
                return Ok(self.finish_failed(run, err));
            }
        };

        run.begin_classify(image.clone());
        self.publish(&run);

        let predictions = match self.classify(&image).await {
            Ok(predictions) => predictions,
            Err(err) => return Ok(self.finish_failed(run, err)),
        };

        let top = predictions.top().clone();
        run.begin_persist(predictions);
        self.publish(&run);

        match self.store.append(&top.species_label, top.confidence).await {
            Ok(record) => {
                info!(
                    "Run {} identified {} ({:.2}), saved as record {}",
                    run.id, record.species_label, record.confidence, record.id
                );
                run.complete(record);
                self.publish(&run);
                Ok(run)
            }
            Err(err) => {
                warn!("Run {} classified but not saved: {err}", run.id);
                let err = match err {
                    Error::StorageWrite(message) => Error::Persistence(message),
                    other => Error::Persistence(other.to_string()),
                };
                Ok(self.finish_failed(run, err))
            }
        }
    }

    /// Drops the held terminal run. Rejected while a run is in flight.
    pub async fn discard(&self) -> Result<()> {
        let mut current = self.lock_current();
        if current.as_ref().is_some_and(PipelineRun::is_active) {
            return Err(Error::PipelineBusy);
        }
        if let Some(run) = current.take() {
            debug!("Discarded run {}", run.id);
        }
        self.updates.send_replace(None);
        Ok(())
    }

    async fn classify(&self, image: &ImageHandle) -> Result<Predictions> {
        match tokio::time::timeout(self.classify_timeout, self.classifier.classify(image)).await {
            Ok(Ok(predictions)) => Ok(predictions),
            Ok(Err(Error::Classification(message))) => Err(Error::Classification(message)),
            Ok(Err(other)) => Err(Error::Classification(other.to_string())),
            Err(_) => Err(Error::Classification(format!(
                "timed out after {} ms",
                self.classify_timeout.as_millis()
            ))),
        }
    }

    fn finish_failed(&self, mut run: PipelineRun, err: Error) -> PipelineRun {
        warn!("Run {} failed: {err}", run.id);
        run.fail(err);
        self.publish(&run);
        run
    }

    fn publish(&self, run: &PipelineRun) {
        *self.lock_current() = Some(run.clone());
        self.updates.send_replace(Some(run.clone()));
        if run.status != RunStatus::Idle {
            debug!("Run {} -> {:?}", run.id, run.status);
        }
    }

    // Never held across an await, so a poisoned lock still holds a
    // consistent run.
    fn lock_current(&self) -> MutexGuard<'_, Option<PipelineRun>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fails the run it was created for if `identify` exits before the run
/// reached a terminal state.
struct AbandonGuard<'a> {
    pipeline: &'a IdentificationPipeline,
    run_id: Uuid,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let mut current = self.pipeline.lock_current();
        let Some(run) = current
            .as_mut()
            .filter(|run| run.id == self.run_id && run.is_active())
        else {
            return;
        };

        let err = match run.status {
            RunStatus::Capturing => Error::Capture(ABANDONED.into()),
            RunStatus::Persisting => Error::Persistence(ABANDONED.into()),
            _ => Error::Classification(ABANDONED.into()),
        };
        warn!("Run {} abandoned while {:?}", run.id, run.status);
        run.fail(err);
        self.pipeline.updates.send_replace(Some(run.clone()));
    }
}
