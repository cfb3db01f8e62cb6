//! Adaptive Opponent for Odds or Evens
//!
//! The computer side of a finger-counting odds-or-evens game. It learns
//! what the player tends to show and declare, counters the predicted move,
//! and remembers everything between sessions.
//! - [`features`]: history and round context to a fixed feature record
//! - [`predictor`]: online models with a frequency fallback
//! - [`strategy`]: predicted move to a winning robot reveal
//! - [`store`]: history, statistics and model persistence
//! - [`Opponent`]: the per-round API used by the game loop

pub mod config;
pub mod error;
pub mod features;
pub mod game;
pub mod model;
pub mod opponent;
pub mod predictor;
pub mod stats;
pub mod store;
pub mod strategy;

pub use config::OpponentConfig;
pub use error::{OpponentError, Result};
pub use features::Features;
pub use game::{MatchConfig, MatchState, RoundContext, RoundRecord};
pub use model::ModelState;
pub use opponent::{Opponent, OpponentStatus};
pub use predictor::{BehaviorPredictor, LearnOutcome, Prediction, PredictionSource};
pub use stats::PlayerStatistics;
pub use store::{DataStore, Snapshot};
pub use strategy::{counter_moves, select_move, Choice, Parity};

use serde::{Deserialize, Serialize};

/// Smallest legal finger count
pub const MIN_FINGERS: u8 = 1;
/// Largest legal finger count
pub const MAX_FINGERS: u8 = 5;

/// The two sides of a round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Player,
    Robot,
}

/// Who takes a round
///
/// The player declared `player_choice`; they win when the total's parity
/// matches it, otherwise the robot wins.
pub fn round_winner(player_fingers: u8, robot_fingers: u8, player_choice: Choice) -> Side {
    let total = player_fingers as u32 + robot_fingers as u32;
    if Parity::of(total) == player_choice.winning_parity() {
        Side::Player
    } else {
        Side::Robot
    }
}
