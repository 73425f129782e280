//! Species classification capability.
//!
//! Any model plugged in behind [`Classifier`] must hand back a [`Predictions`]
//! set; its constructor enforces ordering and bounds, so the pipeline never
//! sees an unranked or out-of-range result.

pub mod simulated;

pub use simulated::SimulatedClassifier;

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{capture::ImageHandle, Error, Result};

/// Maximum number of predictions kept per classification.
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub species_label: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(species_label: impl Into<String>, confidence: f64) -> Self {
        Self {
            species_label: species_label.into(),
            confidence,
        }
    }

    /// Confidence as a whole percentage, for display.
    pub fn percent(&self) -> u8 {
        (self.confidence * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Non-empty, confidence-descending list of at most [`TOP_K`] predictions.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Predictions(Vec<Prediction>);

impl Predictions {
    /// Sorts by confidence (stable, descending) and keeps the best [`TOP_K`].
    /// Empty input, NaN or out-of-range confidences are rejected.
    pub fn new(mut predictions: Vec<Prediction>) -> Result<Self> {
        if predictions.is_empty() {
            return Err(Error::Classification("model returned no predictions".into()));
        }

        if let Some(bad) = predictions
            .iter()
            .find(|p| !(0.0..=1.0).contains(&p.confidence))
        {
            return Err(Error::Classification(format!(
                "confidence {} for '{}' is outside [0, 1]",
                bad.confidence, bad.species_label
            )));
        }

        predictions.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        predictions.truncate(TOP_K);
        Ok(Self(predictions))
    }

    pub fn top(&self) -> &Prediction {
        &self.0[0]
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prediction> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Prediction> {
        self.0
    }
}

impl<'de> Deserialize<'de> for Predictions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = Vec::<Prediction>::deserialize(deserializer)?;
        Predictions::new(raw).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Predictions {
    type Item = &'a Prediction;
    type IntoIter = std::slice::Iter<'a, Prediction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Loads whatever the model needs. Called once by the startup sequence.
    async fn prepare(&self) -> Result<()>;

    fn is_ready(&self) -> bool;

    /// Fails with `ClassifierUnavailable` before [`prepare`](Self::prepare)
    /// succeeded, `Classification` on any internal failure.
    async fn classify(&self, image: &ImageHandle) -> Result<Predictions>;
}
