//! Which screen the presentation layer shows, and which intents are legal.
//!
//! The machine is pure: it never touches storage or the pipeline. Callers
//! pass in whether a run is in flight and act on the returned screen.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::{
    classifier::Predictions,
    pipeline::PipelineRun,
    Error, Result,
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Capture,
    Results,
    History,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::Capture => "capture",
            Screen::Results => "results",
            Screen::History => "history",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum ScreenEvent {
    /// The pipeline reached `Done` or `Failed`.
    RunFinished(PipelineRun),
    ShowHistory,
    IdentifyAnother,
    NewScan,
}

/// Message shown in place on the Capture screen after a failed run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub message: String,
    /// Predictions that were classified but could not be saved.
    pub unsaved_result: Option<Predictions>,
}

#[derive(Debug, Clone)]
pub struct ScreenStateMachine {
    screen: Screen,
    held: Option<PipelineRun>,
    notice: Option<Notice>,
}

impl Default for ScreenStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenStateMachine {
    pub fn new() -> Self {
        Self {
            screen: Screen::Capture,
            held: None,
            notice: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn held_run(&self) -> Option<&PipelineRun> {
        self.held.as_ref()
    }

    pub fn held_result(&self) -> Option<&Predictions> {
        self.held.as_ref().and_then(|run| run.result.as_ref())
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Applies `event` and returns the resulting screen. State is left
    /// untouched when the event is rejected.
    pub fn apply(&mut self, event: ScreenEvent, pipeline_active: bool) -> Result<Screen> {
        if pipeline_active {
            return Err(Error::TransitionBlocked);
        }

        let from = self.screen;
        match event {
            ScreenEvent::RunFinished(run) => self.finish_run(run)?,
            ScreenEvent::ShowHistory => {
                self.held = None;
                self.notice = None;
                self.screen = Screen::History;
            }
            ScreenEvent::IdentifyAnother => {
                if from != Screen::Results {
                    return Err(Error::InvalidTransition {
                        from,
                        action: "identify another",
                    });
                }
                self.held = None;
                self.screen = Screen::Capture;
            }
            ScreenEvent::NewScan => {
                if from != Screen::History {
                    return Err(Error::InvalidTransition {
                        from,
                        action: "start a new scan",
                    });
                }
                self.screen = Screen::Capture;
            }
        }

        if from != self.screen {
            debug!("Screen {from} -> {}", self.screen);
        }
        Ok(self.screen)
    }

    fn finish_run(&mut self, run: PipelineRun) -> Result<()> {
        if self.screen != Screen::Capture {
            return Err(Error::InvalidTransition {
                from: self.screen,
                action: "show results",
            });
        }
        if !run.status.is_terminal() {
            return Err(Error::TransitionBlocked);
        }

        if run.succeeded() {
            self.notice = None;
            self.held = Some(run);
            self.screen = Screen::Results;
            return Ok(());
        }

        let message = run
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "identification failed".to_string());
        let unsaved_result = match run.error {
            Some(Error::Persistence(_)) => run.result,
            _ => None,
        };
        self.notice = Some(Notice {
            message,
            unsaved_result,
        });
        Ok(())
    }
}
