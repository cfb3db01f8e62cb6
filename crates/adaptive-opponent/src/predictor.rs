//! Player behavior prediction
//!
//! Two predictors:
//! - [`OnlinePredictor`]: a [`BehaviorModel`] doing online
//!   regression/classification over [`Features`]
//! - [`FrequencyPredictor`]: most-used finger count and declaration so far,
//!   read straight from [`PlayerStatistics`]
//!
//! [`BehaviorPredictor`] picks one of them at construction and keeps it for
//! its lifetime. When the online model fails on a given round, that round
//! falls back to the frequency prediction.

use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{OpponentError, Result};
use crate::features::{Features, NEUTRAL_FINGERS};
use crate::game::RoundRecord;
use crate::model::ModelState;
use crate::stats::PlayerStatistics;
use crate::strategy::Choice;
use crate::{MAX_FINGERS, MIN_FINGERS};

/// Where a prediction came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    #[default]
    Model,
    Frequency,
}

/// Guess of the player's next move
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Always within 1..=5
    #[serde(deserialize_with = "finger_count_from_number_or_text")]
    pub finger_count: u8,
    pub choice: Choice,
    /// 0 at the decision boundary, 1 at certainty
    pub confidence: f64,
    #[serde(default)]
    pub source: PredictionSource,
}

/// Older history documents store the frequency guess as text, e.g. `"2"`
fn finger_count_from_number_or_text<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u8),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Prediction {
    /// Prediction used before anything has been learned
    pub fn neutral() -> Self {
        Self {
            finger_count: NEUTRAL_FINGERS as u8,
            choice: Choice::Odds,
            confidence: 0.0,
            source: PredictionSource::Model,
        }
    }
}

/// What the player actually did in a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    pub finger_count: u8,
    pub choice: Choice,
}

impl From<&RoundRecord> for Observation {
    fn from(record: &RoundRecord) -> Self {
        Self {
            finger_count: record.player_fingers,
            choice: record.player_choice,
        }
    }
}

/// Round a raw finger estimate onto a legal finger count
pub fn clamp_fingers(raw: f64) -> u8 {
    if !raw.is_finite() {
        return NEUTRAL_FINGERS as u8;
    }
    raw.round().clamp(MIN_FINGERS as f64, MAX_FINGERS as f64) as u8
}

/// Map P(odds) to a declaration and a linear confidence
pub fn choice_from_probability(p_odds: f64) -> (Choice, f64) {
    let choice = if p_odds > 0.5 { Choice::Odds } else { Choice::Evens };
    let confidence = (2.0 * (p_odds - 0.5).abs()).clamp(0.0, 1.0);
    (choice, confidence)
}

/// A model trained online from resolved rounds
pub trait BehaviorModel {
    /// Predict the player's next move
    fn predict(&self, features: &Features, stats: &PlayerStatistics) -> Result<Prediction>;

    /// Learn from one resolved round
    ///
    /// # Arguments
    /// * `features` - The features the round was predicted from
    /// * `observed` - What the player really did
    /// * `last` - The prediction made before the round, if any
    fn learn(
        &mut self,
        features: &Features,
        observed: &Observation,
        last: Option<&Prediction>,
    ) -> Result<()>;

    /// Forget everything learned so far
    fn reset(&mut self);
}

/// Frequency-based guess from aggregate statistics
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyPredictor {
    confidence: f64,
}

impl FrequencyPredictor {
    pub fn new(confidence: f64) -> Self {
        Self { confidence }
    }

    pub fn predict_from(&self, stats: &PlayerStatistics) -> Prediction {
        Prediction {
            finger_count: stats.most_used_fingers().unwrap_or(NEUTRAL_FINGERS as u8),
            choice: stats.most_used_choice().unwrap_or(Choice::Odds),
            confidence: self.confidence,
            source: PredictionSource::Frequency,
        }
    }
}

/// Online finger-count regressor and odds/evens classifier
#[derive(Clone, Debug, PartialEq)]
pub struct OnlinePredictor {
    state: ModelState,
    learning_rate: f64,
}

impl OnlinePredictor {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            state: ModelState::new(learning_rate),
            learning_rate,
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn restore(&mut self, state: ModelState) {
        self.state = state;
    }
}

impl BehaviorModel for OnlinePredictor {
    fn predict(&self, features: &Features, _stats: &PlayerStatistics) -> Result<Prediction> {
        if self.state.examples_seen() == 0 {
            return Ok(Prediction::neutral());
        }

        let x = features.to_vector();
        let finger_count = clamp_fingers(self.state.finger.predict(&x)?);
        let (choice, confidence) = choice_from_probability(self.state.choice.predict_proba(&x)?);

        Ok(Prediction {
            finger_count,
            choice,
            confidence,
            source: PredictionSource::Model,
        })
    }

    fn learn(
        &mut self,
        features: &Features,
        observed: &Observation,
        last: Option<&Prediction>,
    ) -> Result<()> {
        let x = features.to_vector();
        let picked_odds = observed.choice == Choice::Odds;

        // commit both models together or not at all
        let mut next = self.state.clone();
        next.finger.learn(&x, observed.finger_count as f64)?;
        next.choice.learn(&x, picked_odds)?;

        if let Some(last) = last {
            next.finger_mae
                .update(observed.finger_count as f64, last.finger_count as f64);
            next.choice_accuracy
                .update(picked_odds, last.choice == Choice::Odds);
        }

        self.state = next;
        Ok(())
    }

    fn reset(&mut self) {
        self.state = ModelState::new(self.learning_rate);
    }
}

/// Result of feeding one round back to the predictor
#[derive(Clone, Debug, PartialEq)]
pub enum LearnOutcome {
    /// Online models were updated
    Learned,
    /// Degraded mode, nothing to train
    FrequencyOnly,
    /// The online update failed and was skipped for this round
    Skipped(String),
}

/// The predictor selected for this opponent's lifetime
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorPredictor {
    Online {
        model: OnlinePredictor,
        fallback: FrequencyPredictor,
    },
    Frequency(FrequencyPredictor),
}

impl BehaviorPredictor {
    pub fn online(learning_rate: f64, fallback_confidence: f64) -> Self {
        BehaviorPredictor::Online {
            model: OnlinePredictor::new(learning_rate),
            fallback: FrequencyPredictor::new(fallback_confidence),
        }
    }

    pub fn frequency(fallback_confidence: f64) -> Self {
        BehaviorPredictor::Frequency(FrequencyPredictor::new(fallback_confidence))
    }

    pub fn is_online(&self) -> bool {
        matches!(self, BehaviorPredictor::Online { .. })
    }

    /// Predict the next move, never failing
    pub fn predict(&self, features: &Features, stats: &PlayerStatistics) -> Prediction {
        match self {
            BehaviorPredictor::Online { model, fallback } => {
                match model.predict(features, stats) {
                    Ok(prediction) => {
                        debug!(
                            "round {}: predicted {} fingers, {} ({:.0}% confident)",
                            features.current_round,
                            prediction.finger_count,
                            prediction.choice,
                            prediction.confidence * 100.0
                        );
                        prediction
                    }
                    Err(e) => {
                        warn!("online prediction failed, using frequencies: {}", e);
                        fallback.predict_from(stats)
                    }
                }
            }
            BehaviorPredictor::Frequency(fallback) => fallback.predict_from(stats),
        }
    }

    /// Learn from a resolved round. Failures are reported, not raised.
    pub fn learn(
        &mut self,
        features: &Features,
        observed: &Observation,
        last: Option<&Prediction>,
    ) -> LearnOutcome {
        match self {
            BehaviorPredictor::Online { model, .. } => match model.learn(features, observed, last) {
                Ok(()) => LearnOutcome::Learned,
                Err(e) => {
                    warn!("model update skipped: {}", e);
                    LearnOutcome::Skipped(e.to_string())
                }
            },
            BehaviorPredictor::Frequency(_) => LearnOutcome::FrequencyOnly,
        }
    }

    /// Fresh models, if this predictor has any
    pub fn reset(&mut self) {
        match self {
            BehaviorPredictor::Online { model, .. } => model.reset(),
            // counts live in PlayerStatistics
            BehaviorPredictor::Frequency(_) => {}
        }
    }

    pub fn model_state(&self) -> Option<&ModelState> {
        match self {
            BehaviorPredictor::Online { model, .. } => Some(model.state()),
            BehaviorPredictor::Frequency(_) => None,
        }
    }

    /// Install a loaded model state. Ignored in frequency mode.
    pub fn restore(&mut self, state: ModelState) -> Result<()> {
        match self {
            BehaviorPredictor::Online { model, .. } => {
                model.restore(state);
                Ok(())
            }
            BehaviorPredictor::Frequency(_) => Err(OpponentError::Learning(
                "no online model to restore into".to_string(),
            )),
        }
    }
}
