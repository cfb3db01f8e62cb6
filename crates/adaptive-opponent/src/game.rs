//! Round resolution and match bookkeeping

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::predictor::Prediction;
use crate::strategy::{Choice, Parity};
use crate::{round_winner, Side};

/// One completed round, as appended to the game history
///
/// Field names follow the persisted history document. Unknown fields in
/// that document are ignored on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub timestamp: NaiveDateTime,
    pub current_round: u32,
    pub player_fingers: u8,
    pub robot_fingers: u8,
    pub player_choice: Choice,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub is_odd: bool,
    pub player_won_round: bool,
    #[serde(default)]
    pub player_wins: u32,
    #[serde(default)]
    pub robot_wins: u32,
    /// Dropped on load when the stored prediction is malformed
    #[serde(default, deserialize_with = "prediction_or_none")]
    pub ai_prediction: Option<Prediction>,
    #[serde(default)]
    pub game_finished: bool,
}

fn prediction_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<Prediction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl RoundRecord {
    /// The context the opponent saw before this round was played
    pub fn pre_round_context(&self) -> RoundContext {
        let (player_before, robot_before) = if self.player_won_round {
            (self.player_wins.saturating_sub(1), self.robot_wins)
        } else {
            (self.player_wins, self.robot_wins.saturating_sub(1))
        };

        RoundContext {
            round: self.current_round.max(1),
            player_wins: player_before,
            robot_wins: robot_before,
        }
    }
}

/// What the orchestrator knows before a round is played
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundContext {
    /// 1-based round index within the current game
    pub round: u32,
    pub player_wins: u32,
    pub robot_wins: u32,
}

impl Default for RoundContext {
    fn default() -> Self {
        Self { round: 1, player_wins: 0, robot_wins: 0 }
    }
}

/// Rules for when a game ends
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub max_rounds: u32,
    pub wins_to_finish: u32,
}

impl MatchConfig {
    /// Best of three: first to two round wins
    pub fn best_of_three() -> Self {
        Self { max_rounds: 3, wins_to_finish: 2 }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::best_of_three()
    }
}

/// Score and round counter of the game in progress
#[derive(Clone, Debug)]
pub struct MatchState {
    config: MatchConfig,
    round: u32,
    player_wins: u32,
    robot_wins: u32,
    finished: bool,
}

impl MatchState {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            round: 1,
            player_wins: 0,
            robot_wins: 0,
            finished: false,
        }
    }

    pub fn context(&self) -> RoundContext {
        RoundContext {
            round: self.round,
            player_wins: self.player_wins,
            robot_wins: self.robot_wins,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Side that took the game, once it is over. A drawn game (only
    /// possible when `max_rounds` is even) has no winner.
    pub fn winner(&self) -> Option<Side> {
        if !self.finished {
            return None;
        }
        match self.player_wins.cmp(&self.robot_wins) {
            std::cmp::Ordering::Greater => Some(Side::Player),
            std::cmp::Ordering::Less => Some(Side::Robot),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Settle the current round and build its record
    ///
    /// # Arguments
    /// * `player_fingers` - Fingers the player actually showed
    /// * `player_choice` - The player's declaration for this round
    /// * `robot_fingers` - Fingers the robot showed
    /// * `prediction` - What the opponent predicted before the reveal
    pub fn resolve(
        &mut self,
        player_fingers: u8,
        player_choice: Choice,
        robot_fingers: u8,
        prediction: Option<Prediction>,
    ) -> RoundRecord {
        let total = player_fingers as u32 + robot_fingers as u32;
        let winner = round_winner(player_fingers, robot_fingers, player_choice);

        match winner {
            Side::Player => self.player_wins += 1,
            Side::Robot => self.robot_wins += 1,
        }

        self.finished = self.player_wins >= self.config.wins_to_finish
            || self.robot_wins >= self.config.wins_to_finish
            || self.round >= self.config.max_rounds;

        RoundRecord {
            timestamp: Local::now().naive_local(),
            current_round: self.round,
            player_fingers,
            robot_fingers,
            player_choice,
            total,
            is_odd: Parity::of(total) == Parity::Odd,
            player_won_round: winner == Side::Player,
            player_wins: self.player_wins,
            robot_wins: self.robot_wins,
            ai_prediction: prediction,
            game_finished: self.finished,
        }
    }

    /// Advance to the next round. Returns false once the game is over.
    pub fn next_round(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.round += 1;
        true
    }
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_player_wins_with_odds() {
        let mut state = MatchState::default();

        let record = state.resolve(2, Choice::Odds, 3, None);

        assert_eq!(record.total, 5);
        assert!(record.is_odd);
        assert!(record.player_won_round);
        assert_eq!(record.player_wins, 1);
        assert_eq!(record.robot_wins, 0);
        assert_eq!(record.current_round, 1);
        assert!(!record.game_finished);
    }

    #[test]
    fn test_resolve_robot_wins_with_evens_declared() {
        let mut state = MatchState::default();

        let record = state.resolve(2, Choice::Evens, 3, None);

        assert!(!record.player_won_round);
        assert_eq!(record.robot_wins, 1);
    }

    #[test]
    fn test_first_to_two_finishes() {
        let mut state = MatchState::default();

        state.resolve(1, Choice::Evens, 1, None);
        assert!(state.next_round());
        let record = state.resolve(2, Choice::Evens, 2, None);

        assert!(record.game_finished);
        assert!(state.is_finished());
        assert_eq!(state.winner(), Some(Side::Player));
        assert!(!state.next_round());
    }

    #[test]
    fn test_max_rounds_finishes() {
        let mut state = MatchState::new(MatchConfig { max_rounds: 2, wins_to_finish: 5 });

        state.resolve(1, Choice::Odds, 1, None);
        state.next_round();
        let record = state.resolve(1, Choice::Odds, 2, None);

        // one round each
        assert!(record.game_finished);
        assert_eq!(state.winner(), None);
    }

    #[test]
    fn test_context_tracks_score() {
        let mut state = MatchState::default();
        assert_eq!(state.context(), RoundContext::default());

        state.resolve(1, Choice::Evens, 1, None);
        state.next_round();

        assert_eq!(state.context(), RoundContext { round: 2, player_wins: 1, robot_wins: 0 });
    }

    #[test]
    fn test_pre_round_context() {
        let mut state = MatchState::default();
        state.resolve(1, Choice::Evens, 1, None);
        state.next_round();
        let record = state.resolve(1, Choice::Evens, 2, None);

        assert_eq!(
            record.pre_round_context(),
            RoundContext { round: 2, player_wins: 1, robot_wins: 0 }
        );
    }

    #[test]
    fn test_record_tolerates_unknown_fields() {
        let json = r#"{
            "timestamp": "2024-03-01T18:22:05.123456",
            "current_round": 2,
            "player_fingers": 4,
            "robot_fingers": 1,
            "player_choice": "evens",
            "player_won_round": false,
            "camera": "usb0"
        }"#;

        let record: RoundRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.player_fingers, 4);
        assert_eq!(record.player_choice, Choice::Evens);
        assert!(record.ai_prediction.is_none());
        assert!(!record.game_finished);
    }
}
