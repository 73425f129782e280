//! One-time startup: permission, then schema, then classifier.
//!
//! Steps run in order, once, without retries. The first failure halts the
//! sequence and is reported as [`Error::Initialization`] naming the step.

use std::{fmt, sync::Arc};

use log::{error, info};
use serde::Serialize;

use crate::{capture::PermissionGate, classifier::Classifier, store::RecordStore, Error, Result};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InitStep {
    CapturePermission,
    StorageSchema,
    ClassifierReadiness,
}

impl InitStep {
    pub const ORDER: [InitStep; 3] = [
        InitStep::CapturePermission,
        InitStep::StorageSchema,
        InitStep::ClassifierReadiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InitStep::CapturePermission => "capture permission",
            InitStep::StorageSchema => "storage schema",
            InitStep::ClassifierReadiness => "classifier readiness",
        }
    }
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct InitializationSequencer {
    permission: Arc<dyn PermissionGate>,
    store: Arc<dyn RecordStore>,
    classifier: Arc<dyn Classifier>,
}

impl InitializationSequencer {
    pub fn new(
        permission: Arc<dyn PermissionGate>,
        store: Arc<dyn RecordStore>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            permission,
            store,
            classifier,
        }
    }

    /// Consumes the sequencer so the sequence can only ever run once.
    pub async fn run(self) -> Result<()> {
        for step in InitStep::ORDER {
            if let Err(message) = self.run_step(step).await {
                error!("Startup halted at {step}: {message}");
                return Err(Error::Initialization { step, message });
            }
            info!("Startup step complete: {step}");
        }

        info!("Startup complete");
        Ok(())
    }

    async fn run_step(&self, step: InitStep) -> std::result::Result<(), String> {
        match step {
            InitStep::CapturePermission => {
                match self.permission.request_capture_permission().await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err("camera access was denied".into()),
                    Err(err) => Err(err.to_string()),
                }
            }
            InitStep::StorageSchema => self.store.ensure_schema().await.map_err(|err| err.to_string()),
            InitStep::ClassifierReadiness => {
                self.classifier.prepare().await.map_err(|err| err.to_string())?;
                if self.classifier.is_ready() {
                    Ok(())
                } else {
                    Err("classifier did not report ready".into())
                }
            }
        }
    }
}
