//! Opponent configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for the opponent and its data store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentConfig {
    /// Directory holding all persisted artifacts
    pub data_dir: PathBuf,
    /// Game history document (JSON array of round records)
    pub history_file: String,
    /// Player statistics document (JSON object)
    pub statistics_file: String,
    /// Opaque model-state blob
    pub model_file: String,
    /// Whether the online models are available. `false` runs the
    /// opponent in frequency-only mode for its whole lifetime.
    pub online_learning: bool,
    /// Number of recent rounds the short-window features look at
    pub recent_window: usize,
    /// Confidence reported by frequency-based predictions
    pub fallback_confidence: f64,
    /// SGD step size for both online models
    pub learning_rate: f64,
    /// Fixed RNG seed for the strategy selector, `None` for OS entropy
    pub seed: Option<u64>,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_file: "game_history.json".to_string(),
            statistics_file: "statistics.json".to_string(),
            model_file: "ai_model.bin".to_string(),
            online_learning: true,
            recent_window: 5,
            fallback_confidence: 0.1,
            learning_rate: 0.01,
            seed: None,
        }
    }
}

impl OpponentConfig {
    /// Default configuration rooted at `dir`
    pub fn with_data_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Disable the online models (degraded mode)
    pub fn offline(mut self) -> Self {
        self.online_learning = false;
        self
    }

    /// Make the strategy selector deterministic
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(&self.history_file)
    }

    pub fn statistics_path(&self) -> PathBuf {
        self.data_dir.join(&self.statistics_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }
}
