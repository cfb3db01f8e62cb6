//! Feature extraction from the game history
//!
//! Turns the current round context and the recorded history into a
//! fixed-schema feature record. Short histories degrade to neutral values
//! instead of failing.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::game::{RoundContext, RoundRecord};
use crate::strategy::Choice;

/// Number of numeric features fed to the online models
pub const FEATURE_COUNT: usize = 12;

/// Feature names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "hour",
    "minute",
    "day_of_week",
    "current_round",
    "player_wins",
    "robot_wins",
    "rounds_played",
    "avg_recent_fingers",
    "last_finger_count",
    "recent_odds_ratio",
    "recent_win_rate",
    "finger_change",
];

/// Neutral finger count used before any history exists
pub const NEUTRAL_FINGERS: f64 = 3.0;
/// Neutral ratio for odds share and win rate
pub const NEUTRAL_RATIO: f64 = 0.5;

/// Snapshot of everything the predictor looks at for one round
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Features {
    // time of day
    pub hour: f64,
    pub minute: f64,
    /// Monday = 0
    pub day_of_week: f64,

    // current match
    pub current_round: f64,
    pub player_wins: f64,
    pub robot_wins: f64,
    /// Rounds recorded across all sessions
    pub rounds_played: f64,

    // recent behavior
    pub avg_recent_fingers: f64,
    pub last_finger_count: f64,
    pub recent_odds_ratio: f64,
    pub recent_win_rate: f64,
    /// Last finger count minus the one before it
    pub finger_change: f64,
}

impl Features {
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.hour,
            self.minute,
            self.day_of_week,
            self.current_round,
            self.player_wins,
            self.robot_wins,
            self.rounds_played,
            self.avg_recent_fingers,
            self.last_finger_count,
            self.recent_odds_ratio,
            self.recent_win_rate,
            self.finger_change,
        ]
    }
}

/// Extract features using the local wall clock
pub fn extract(context: &RoundContext, history: &[RoundRecord], window: usize) -> Features {
    extract_at(context, history, window, Local::now().naive_local())
}

/// Extract features at a fixed point in time
///
/// # Arguments
/// * `context` - Round index and both win counts before this round
/// * `history` - Every recorded round, oldest first
/// * `window` - How many recent rounds the short-window features cover
/// * `now` - Clock reading for the time-of-day features
pub fn extract_at(
    context: &RoundContext,
    history: &[RoundRecord],
    window: usize,
    now: NaiveDateTime,
) -> Features {
    let start = history.len().saturating_sub(window.max(1));
    let recent = &history[start..];

    let (avg_recent_fingers, last_finger_count, recent_odds_ratio, recent_win_rate) =
        match recent.last() {
            None => (NEUTRAL_FINGERS, NEUTRAL_FINGERS, NEUTRAL_RATIO, NEUTRAL_RATIO),
            Some(last) => {
                let n = recent.len() as f64;
                let fingers: f64 = recent.iter().map(|r| r.player_fingers as f64).sum();
                let odds = recent.iter().filter(|r| r.player_choice == Choice::Odds).count();
                let wins = recent.iter().filter(|r| r.player_won_round).count();
                (
                    fingers / n,
                    last.player_fingers as f64,
                    odds as f64 / n,
                    wins as f64 / n,
                )
            }
        };

    let finger_change = match history {
        [.., before, last] => last.player_fingers as f64 - before.player_fingers as f64,
        _ => 0.0,
    };

    Features {
        hour: now.hour() as f64,
        minute: now.minute() as f64,
        day_of_week: now.weekday().num_days_from_monday() as f64,
        current_round: context.round.max(1) as f64,
        player_wins: context.player_wins as f64,
        robot_wins: context.robot_wins as f64,
        rounds_played: history.len() as f64,
        avg_recent_fingers,
        last_finger_count,
        recent_odds_ratio,
        recent_win_rate,
        finger_change,
    }
}
