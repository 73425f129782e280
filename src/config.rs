use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::classifier::TOP_K;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;
const DEFAULT_CLASSIFY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_LABEL_COUNT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierSettings {
    pub labels: Vec<String>,
    /// Fixed seed for reproducible output; random when absent.
    pub seed: Option<u64>,
    pub latency_ms: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            labels: (0..DEFAULT_LABEL_COUNT)
                .map(|idx| format!("Species_{idx}"))
                .collect(),
            seed: None,
            latency_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub history_limit: usize,
    pub classify_timeout_ms: u64,
    pub debug: bool,
    pub classifier: ClassifierSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("leafscan.sqlite3"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            classify_timeout_ms: DEFAULT_CLASSIFY_TIMEOUT_MS,
            debug: false,
            classifier: ClassifierSettings::default(),
        }
    }
}

impl AppConfig {
    /// Reads settings from `path`. A missing file yields defaults; a file that
    /// fails to parse is logged and replaced by defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings at {}: {err}", path.display());
                Self::default()
            })
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("LEAFSCAN_DB_PATH") {
            if !path.is_empty() {
                self.database_path = PathBuf::from(path);
            }
        }
        if let Ok(value) = std::env::var("LEAFSCAN_DEBUG") {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.history_limit == 0 {
            return Err(crate::Error::Config("history_limit must be greater than zero".into()));
        }
        if self.classify_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "classify_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.classifier.labels.len() < TOP_K {
            return Err(crate::Error::Config(format!(
                "classifier needs at least {TOP_K} labels, got {}",
                self.classifier.labels.len()
            )));
        }
        Ok(())
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}
