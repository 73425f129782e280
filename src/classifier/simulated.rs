use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{Classifier, Prediction, Predictions, TOP_K};
use crate::{capture::ImageHandle, config::ClassifierSettings, Error, Result};

const DOMINANT_MIN: f64 = 0.85;
const DOMINANT_MAX: f64 = 0.95;
/// Upper bound of the first secondary band; rank r draws from
/// `[SECONDARY_SPAN / (r + 1), SECONDARY_SPAN / r)`.
const SECONDARY_SPAN: f64 = 0.10;

/// Stand-in model: one dominant label plus decreasing runners-up drawn from
/// disjoint bands, so the ranking holds by construction.
pub struct SimulatedClassifier {
    labels: Vec<String>,
    latency: Duration,
    rng: Mutex<StdRng>,
    ready: AtomicBool,
}

impl SimulatedClassifier {
    pub fn new(settings: &ClassifierSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            labels: settings.labels.clone(),
            latency: Duration::from_millis(settings.latency_ms),
            rng: Mutex::new(rng),
            ready: AtomicBool::new(false),
        }
    }

    fn synthesize(&self) -> Result<Vec<Prediction>> {
        if self.labels.is_empty() {
            return Err(Error::Classification("no species labels configured".into()));
        }

        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let dominant = rng.gen_range(0..self.labels.len());
        let count = TOP_K.min(self.labels.len());

        let mut predictions = Vec::with_capacity(count);
        predictions.push(Prediction::new(
            self.labels[dominant].clone(),
            rng.gen_range(DOMINANT_MIN..=DOMINANT_MAX),
        ));

        for rank in 1..count {
            let upper = SECONDARY_SPAN / rank as f64;
            let lower = SECONDARY_SPAN / (rank + 1) as f64;
            let label = &self.labels[(dominant + rank) % self.labels.len()];
            predictions.push(Prediction::new(label.clone(), rng.gen_range(lower..upper)));
        }

        Ok(predictions)
    }
}

#[async_trait]
impl Classifier for SimulatedClassifier {
    async fn prepare(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(Error::Classification("no species labels configured".into()));
        }
        self.ready.store(true, Ordering::SeqCst);
        info!("Simulated classifier ready with {} labels", self.labels.len());
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn classify(&self, image: &ImageHandle) -> Result<Predictions> {
        if !self.is_ready() {
            return Err(Error::ClassifierUnavailable);
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let predictions = Predictions::new(self.synthesize()?)?;
        debug!(
            "Classified image {} as {} ({:.2})",
            image.id,
            predictions.top().species_label,
            predictions.top().confidence
        );
        Ok(predictions)
    }
}
