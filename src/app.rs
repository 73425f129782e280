//! User intents coming from the presentation layer.
//!
//! `App` glues the pipeline, the record store and the screen machine. The
//! renderer only calls these methods and draws [`AppSnapshot`]s.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    capture::ImageSource,
    classifier::{Classifier, Predictions},
    config::AppConfig,
    db::HistoryRecord,
    pipeline::IdentificationPipeline,
    screen::{Notice, Screen, ScreenEvent, ScreenStateMachine},
    store::RecordStore,
    Error, Result,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot {
    pub screen: Screen,
    pub result: Option<Predictions>,
    pub notice: Option<Notice>,
    pub history: Vec<HistoryRecord>,
}

struct ViewState {
    machine: ScreenStateMachine,
    /// Last list loaded for the History screen.
    history: Vec<HistoryRecord>,
}

#[derive(Clone)]
pub struct App {
    store: Arc<dyn RecordStore>,
    pipeline: IdentificationPipeline,
    view: Arc<Mutex<ViewState>>,
    /// Raised under the view lock when a capture is accepted and lowered
    /// once its outcome reached the screen machine.
    capturing: Arc<AtomicBool>,
    history_limit: usize,
}

/// Lowers the capture flag when dropped, including when `capture` is
/// cancelled mid-run.
struct CaptureSlot<'a>(&'a AtomicBool);

impl Drop for CaptureSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl App {
    /// Assembles the app. Callers must have completed the startup sequence;
    /// see [`crate::bootstrap`].
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn RecordStore>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let pipeline =
            IdentificationPipeline::new(classifier, store.clone(), config.classify_timeout());
        Self {
            store,
            pipeline,
            view: Arc::new(Mutex::new(ViewState {
                machine: ScreenStateMachine::new(),
                history: Vec::new(),
            })),
            capturing: Arc::new(AtomicBool::new(false)),
            history_limit: config.history_limit,
        }
    }

    pub fn pipeline(&self) -> &IdentificationPipeline {
        &self.pipeline
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn snapshot(&self) -> AppSnapshot {
        let view = self.view.lock().await;
        Self::render(&view)
    }

    /// Capture or gallery pick. Runs a full identification and moves to
    /// Results on success; a failed run stays on Capture with a notice.
    pub async fn capture(&self, source: &dyn ImageSource) -> Result<AppSnapshot> {
        let slot = {
            let mut view = self.view.lock().await;
            if self.run_in_flight().await {
                return Err(Error::PipelineBusy);
            }
            let screen = view.machine.screen();
            if screen != Screen::Capture {
                return Err(Error::InvalidTransition {
                    from: screen,
                    action: "capture",
                });
            }
            view.machine.dismiss_notice();
            self.capturing.store(true, Ordering::SeqCst);
            CaptureSlot(&self.capturing)
        };

        // The view lock is released for the run so snapshots stay live and
        // other intents see the capture flag instead of waiting.
        let run = self.pipeline.identify(source).await?;

        let mut view = self.view.lock().await;
        let applied = view.machine.apply(ScreenEvent::RunFinished(run), false);
        drop(slot);
        applied?;
        Ok(Self::render(&view))
    }

    /// Opens History with a fresh read of the store.
    pub async fn show_history(&self) -> Result<AppSnapshot> {
        // Held across the read so no capture can start before the screen
        // moves.
        let mut view = self.view.lock().await;
        if self.run_in_flight().await {
            return Err(Error::TransitionBlocked);
        }

        let records = self.store.list_recent(self.history_limit).await?;

        let from = view.machine.screen();
        view.machine.apply(ScreenEvent::ShowHistory, false)?;
        if from == Screen::Results {
            self.pipeline.discard().await?;
        }
        view.history = records;
        Ok(Self::render(&view))
    }

    /// "Identify another" from Results; drops the held result. The saved
    /// record stays in history.
    pub async fn identify_another(&self) -> Result<AppSnapshot> {
        let mut view = self.view.lock().await;
        let active = self.run_in_flight().await;
        view.machine.apply(ScreenEvent::IdentifyAnother, active)?;
        self.pipeline.discard().await?;
        Ok(Self::render(&view))
    }

    /// "New scan" from History.
    pub async fn new_scan(&self) -> Result<AppSnapshot> {
        let mut view = self.view.lock().await;
        let active = self.run_in_flight().await;
        view.machine.apply(ScreenEvent::NewScan, active)?;
        Ok(Self::render(&view))
    }

    /// Purges every record. The visible list is only emptied once the store
    /// confirmed the purge.
    pub async fn clear_history(&self) -> Result<AppSnapshot> {
        if let Err(err) = self.store.purge_all().await {
            warn!("Clearing history failed: {err}");
            return Err(err);
        }
        info!("History cleared");

        let mut view = self.view.lock().await;
        view.history.clear();
        Ok(Self::render(&view))
    }

    /// Only meaningful while the view lock is held.
    async fn run_in_flight(&self) -> bool {
        self.capturing.load(Ordering::SeqCst) || self.pipeline.is_active().await
    }

    fn render(view: &ViewState) -> AppSnapshot {
        AppSnapshot {
            screen: view.machine.screen(),
            result: view.machine.held_result().cloned(),
            notice: view.machine.notice().cloned(),
            history: view.history.clone(),
        }
    }
}
