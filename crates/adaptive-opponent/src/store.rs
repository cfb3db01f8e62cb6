//! File persistence for history, statistics and model state
//!
//! Three independent artifacts:
//! - history: JSON array of [`RoundRecord`]s
//! - statistics: JSON object of [`PlayerStatistics`]
//! - model: MessagePack blob of [`ModelState`]
//!
//! Loading never fails. A missing or damaged artifact is replaced by its
//! default and the problem is logged.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::Value;

use crate::config::OpponentConfig;
use crate::error::{OpponentError, Result};
use crate::game::RoundRecord;
use crate::model::ModelState;
use crate::stats::PlayerStatistics;

/// Everything the store hands back on load or reset
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub history: Vec<RoundRecord>,
    pub statistics: PlayerStatistics,
    /// `None` when no usable model was found; keep the fresh one
    pub model: Option<ModelState>,
}

/// File-backed store
#[derive(Clone, Debug)]
pub struct DataStore {
    history_path: PathBuf,
    statistics_path: PathBuf,
    model_path: PathBuf,
}

impl DataStore {
    pub fn new(config: &OpponentConfig) -> Self {
        Self {
            history_path: config.history_path(),
            statistics_path: config.statistics_path(),
            model_path: config.model_path(),
        }
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn statistics_path(&self) -> &Path {
        &self.statistics_path
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Write all artifacts. The model is skipped when `None`.
    pub fn save(
        &self,
        history: &[RoundRecord],
        statistics: &PlayerStatistics,
        model: Option<&ModelState>,
    ) -> Result<()> {
        let json = serde_json::to_string_pretty(history)?;
        write_file(&self.history_path, json.as_bytes())?;
        info!("saved {} rounds to {}", history.len(), self.history_path.display());

        let json = serde_json::to_string_pretty(statistics)?;
        write_file(&self.statistics_path, json.as_bytes())?;
        debug!("saved statistics to {}", self.statistics_path.display());

        if let Some(model) = model {
            write_file(&self.model_path, &model.to_bytes()?)?;
            debug!("saved model state to {}", self.model_path.display());
        }

        Ok(())
    }

    /// Read all artifacts back, substituting defaults for anything unusable
    ///
    /// `with_model` is false in frequency mode, where the model blob is
    /// not even read.
    pub fn load(&self, with_model: bool) -> Snapshot {
        let history = match self.load_history() {
            Ok(Some(history)) => {
                info!("loaded {} historical rounds", history.len());
                history
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("discarding game history, starting fresh: {}", e);
                Vec::new()
            }
        };

        let statistics = match self.load_statistics() {
            Ok(Some(statistics)) => {
                info!("loaded player statistics: {} games played", statistics.total_games);
                statistics
            }
            Ok(None) => PlayerStatistics::default(),
            Err(e) => {
                warn!("discarding statistics, using defaults: {}", e);
                PlayerStatistics::default()
            }
        };

        let model = if with_model {
            match self.load_model() {
                Ok(model) => model,
                Err(e) => {
                    warn!("discarding model state, starting with a fresh model: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Snapshot { history, statistics, model }
    }

    /// Empty history, zeroed statistics and, when `with_model`, a fresh
    /// model. Nothing is written.
    pub fn reset(&self, with_model: bool, learning_rate: f64) -> Snapshot {
        Snapshot {
            history: Vec::new(),
            statistics: PlayerStatistics::default(),
            model: with_model.then(|| ModelState::new(learning_rate)),
        }
    }

    fn load_history(&self) -> Result<Option<Vec<RoundRecord>>> {
        let Some(text) = read_if_exists(&self.history_path)? else {
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&text)?;
        if !value.is_array() {
            return Err(OpponentError::Serialization(
                "history is not a sequence of rounds".to_string(),
            ));
        }

        Ok(Some(serde_json::from_value(value)?))
    }

    fn load_statistics(&self) -> Result<Option<PlayerStatistics>> {
        match read_if_exists(&self.statistics_path)? {
            Some(text) => Ok(Some(PlayerStatistics::from_json(&text)?)),
            None => Ok(None),
        }
    }

    fn load_model(&self) -> Result<Option<ModelState>> {
        if !self.model_path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.model_path)?;
        let model = ModelState::from_bytes(&bytes)?;
        info!("loaded model state ({} rounds learned)", model.examples_seen());
        Ok(Some(model))
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        debug!("{} not found", path.display());
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    Ok(())
}
