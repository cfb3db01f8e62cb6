//! The adaptive opponent facade
//!
//! Ties prediction, counter-strategy and persistence together behind the
//! handful of calls the game loop makes each round:
//!
//! 1. [`Opponent::predict_player_behavior`] with the pre-round context
//! 2. [`Opponent::get_robot_strategy`] for the robot's reveal
//! 3. [`Opponent::update_model`] with the resolved [`RoundRecord`]
//! 4. [`Opponent::save_data`]
//!
//! The opponent does no locking. One round's calls must not overlap with
//! another's, and saves must not run concurrently with each other or with
//! a load.

use log::{error, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::OpponentConfig;
use crate::error::Result;
use crate::features::{self, Features};
use crate::game::{RoundContext, RoundRecord};
use crate::model::ModelState;
use crate::predictor::{BehaviorPredictor, LearnOutcome, Observation, Prediction};
use crate::stats::PlayerStatistics;
use crate::store::DataStore;
use crate::strategy::{select_move, validate_move, Choice};

/// Learning progress, for display
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpponentStatus {
    pub rounds_learned: u64,
    pub games_played: u64,
    pub player_win_rate: f64,
    pub online: bool,
    /// Mean absolute error of finger predictions, once any were scored
    pub finger_mae: Option<f64>,
    /// Share of correct odds/evens predictions, once any were scored
    pub choice_accuracy: Option<f64>,
}

/// Computer opponent that learns the player's habits across sessions
pub struct Opponent {
    config: OpponentConfig,
    store: DataStore,
    predictor: BehaviorPredictor,
    history: Vec<RoundRecord>,
    statistics: PlayerStatistics,
    last_prediction: Option<Prediction>,
    last_features: Option<Features>,
    rng: SmallRng,
}

impl Opponent {
    /// Build an opponent and load whatever was saved before
    pub fn new(config: OpponentConfig) -> Self {
        let mut opponent = Self::fresh(config);
        opponent.load_data();
        opponent
    }

    /// Build an opponent without reading the data directory
    pub fn fresh(config: OpponentConfig) -> Self {
        let predictor = if config.online_learning {
            BehaviorPredictor::online(config.learning_rate, config.fallback_confidence)
        } else {
            warn!("online learning unavailable, predicting from frequencies only");
            BehaviorPredictor::frequency(config.fallback_confidence)
        };
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        Self {
            store: DataStore::new(&config),
            config,
            predictor,
            history: Vec::new(),
            statistics: PlayerStatistics::default(),
            last_prediction: None,
            last_features: None,
            rng,
        }
    }

    pub fn config(&self) -> &OpponentConfig {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        self.predictor.is_online()
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn statistics(&self) -> &PlayerStatistics {
        &self.statistics
    }

    /// Learned model parameters, `None` in frequency mode
    pub fn model_state(&self) -> Option<&ModelState> {
        self.predictor.model_state()
    }

    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.last_prediction.as_ref()
    }

    /// Features for the coming round
    pub fn extract_features(&self, context: &RoundContext) -> Features {
        features::extract(context, &self.history, self.config.recent_window)
    }

    /// Guess the player's next finger count and declaration
    pub fn predict_player_behavior(&mut self, context: &RoundContext) -> Prediction {
        let features = self.extract_features(context);
        let prediction = self.predictor.predict(&features, &self.statistics);

        self.last_features = Some(features);
        self.last_prediction = Some(prediction);
        prediction
    }

    /// Robot finger count that beats the predicted move, always in 1..=5
    pub fn get_robot_strategy(&mut self, predicted_fingers: u8, predicted_choice: Choice) -> u8 {
        let proposed = select_move(predicted_fingers, predicted_choice, &mut self.rng);
        validate_move(proposed as i64, &mut self.rng)
    }

    /// Predict and pick the robot's reveal in one step
    pub fn choose_move(&mut self, context: &RoundContext) -> (Prediction, u8) {
        let prediction = self.predict_player_behavior(context);
        let fingers = self.get_robot_strategy(prediction.finger_count, prediction.choice);
        (prediction, fingers)
    }

    /// Learn from a resolved round and append it to the history
    ///
    /// Statistics and history are updated even if the model update fails.
    pub fn update_model(&mut self, record: RoundRecord) -> LearnOutcome {
        let features = match self.last_features.take() {
            Some(features) => features,
            None => self.extract_features(&record.pre_round_context()),
        };
        let observed = Observation::from(&record);

        let outcome = self
            .predictor
            .learn(&features, &observed, self.last_prediction.as_ref());

        self.statistics.record_round(&record);
        self.history.push(record);

        info!(
            "rounds: {}, games: {}, player win rate: {:.1}%",
            self.statistics.total_rounds,
            self.statistics.total_games,
            self.statistics.win_rate * 100.0
        );

        outcome
    }

    /// Persist history, statistics and (when online) the model
    pub fn save_data(&self) -> Result<()> {
        self.store
            .save(&self.history, &self.statistics, self.predictor.model_state())
            .map_err(|e| {
                error!("failed to save opponent data: {}", e);
                e
            })
    }

    /// Replace in-memory state with what is on disk
    ///
    /// A missing or unusable model blob keeps the current model.
    pub fn load_data(&mut self) {
        let snapshot = self.store.load(self.predictor.is_online());

        self.history = snapshot.history;
        self.statistics = snapshot.statistics;
        if let Some(model) = snapshot.model {
            if let Err(e) = self.predictor.restore(model) {
                warn!("could not restore model state: {}", e);
            }
        }
        self.last_features = None;
    }

    /// Forget everything. Call [`save_data`](Self::save_data) to persist.
    pub fn reset_data(&mut self) {
        let snapshot = self
            .store
            .reset(self.predictor.is_online(), self.config.learning_rate);

        self.history = snapshot.history;
        self.statistics = snapshot.statistics;
        match snapshot.model {
            Some(model) => {
                if let Err(e) = self.predictor.restore(model) {
                    warn!("could not install fresh model state: {}", e);
                }
            }
            None => self.predictor.reset(),
        }
        self.last_prediction = None;
        self.last_features = None;

        info!("opponent data and models reset");
    }

    pub fn status(&self) -> OpponentStatus {
        let model = self.predictor.model_state();

        OpponentStatus {
            rounds_learned: self.statistics.total_rounds,
            games_played: self.statistics.total_games,
            player_win_rate: self.statistics.win_rate,
            online: self.predictor.is_online(),
            finger_mae: model.and_then(|m| m.finger_mae.get()),
            choice_accuracy: model.and_then(|m| m.choice_accuracy.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchState;
    use crate::predictor::PredictionSource;
    use tempfile::tempdir;

    fn opponent_in(dir: &std::path::Path) -> Opponent {
        Opponent::new(OpponentConfig::with_data_dir(dir).with_seed(42))
    }

    #[test]
    fn test_empty_opponent_predicts_neutral() {
        let dir = tempdir().unwrap();
        let mut opponent = opponent_in(dir.path());

        let prediction = opponent.predict_player_behavior(&RoundContext::default());

        assert_eq!(prediction.finger_count, 3);
        assert_eq!(prediction.choice, Choice::Odds);
        assert_eq!(prediction.confidence, 0.0);
    }

    #[test]
    fn test_offline_opponent_uses_frequencies() {
        let dir = tempdir().unwrap();
        let mut opponent = Opponent::new(OpponentConfig::with_data_dir(dir.path()).offline());
        assert!(!opponent.is_online());

        let prediction = opponent.predict_player_behavior(&RoundContext::default());

        assert_eq!(prediction.source, PredictionSource::Frequency);
        assert_eq!(prediction.finger_count, 3);
        assert_eq!(prediction.confidence, 0.1);
    }

    #[test]
    fn test_full_round_cycle() {
        let dir = tempdir().unwrap();
        let mut opponent = opponent_in(dir.path());
        let mut game = MatchState::default();

        let (prediction, robot) = opponent.choose_move(&game.context());
        assert!((1..=5).contains(&robot));

        let record = game.resolve(2, Choice::Evens, robot, Some(prediction));
        let outcome = opponent.update_model(record);

        assert_eq!(outcome, LearnOutcome::Learned);
        assert_eq!(opponent.history().len(), 1);
        assert_eq!(opponent.statistics().total_rounds, 1);
        assert_eq!(opponent.status().rounds_learned, 1);
        assert!(opponent.status().choice_accuracy.is_some());
    }

    #[test]
    fn test_update_without_prediction_still_records() {
        let dir = tempdir().unwrap();
        let mut opponent = opponent_in(dir.path());
        let record = MatchState::default().resolve(4, Choice::Odds, 1, None);

        opponent.update_model(record);

        assert_eq!(opponent.statistics().fingers_used(4), 1);
        assert!(opponent.status().finger_mae.is_none());
    }

    #[test]
    fn test_reset_is_not_persisted() {
        let dir = tempdir().unwrap();
        let mut opponent = opponent_in(dir.path());
        let record = MatchState::default().resolve(4, Choice::Odds, 1, None);
        opponent.update_model(record);
        opponent.save_data().unwrap();

        opponent.reset_data();
        assert!(opponent.history().is_empty());
        assert_eq!(opponent.statistics(), &PlayerStatistics::default());
        assert_eq!(opponent.model_state(), Some(&ModelState::new(0.01)));
        assert!(opponent.status().finger_mae.is_none());

        opponent.load_data();
        assert_eq!(opponent.history().len(), 1);
    }

    #[test]
    fn test_robot_strategy_in_range() {
        let dir = tempdir().unwrap();
        let mut opponent = opponent_in(dir.path());

        for fingers in 1..=5 {
            for choice in Choice::ALL {
                let robot = opponent.get_robot_strategy(fingers, choice);
                assert!((1..=5).contains(&robot));
            }
        }
    }
}
