//! Aggregate player statistics

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OpponentError, Result};
use crate::game::RoundRecord;
use crate::strategy::Choice;
use crate::{MAX_FINGERS, MIN_FINGERS};

/// Keys a statistics document must carry to be trusted
pub const REQUIRED_KEYS: [&str; 5] = [
    "total_games",
    "total_rounds",
    "finger_counts",
    "choice_history",
    "win_rate",
];

/// Counters summarizing the whole game history
///
/// Map keys are strings ("1".."5", "odds"/"evens") to match the
/// statistics document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatistics {
    pub total_games: u64,
    pub total_rounds: u64,
    pub finger_counts: BTreeMap<String, u64>,
    pub choice_history: BTreeMap<String, u64>,
    /// Player round wins / total rounds
    pub win_rate: f64,
    #[serde(default)]
    pub patterns: BTreeMap<String, Value>,
}

impl Default for PlayerStatistics {
    fn default() -> Self {
        let mut stats = Self {
            total_games: 0,
            total_rounds: 0,
            finger_counts: BTreeMap::new(),
            choice_history: BTreeMap::new(),
            win_rate: 0.0,
            patterns: BTreeMap::new(),
        };
        stats.backfill();
        stats
    }
}

impl PlayerStatistics {
    /// Parse a statistics document
    ///
    /// Rejects anything that is not an object carrying every
    /// [`REQUIRED_KEYS`] entry; a partial document is never merged.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let object = value
            .as_object()
            .ok_or_else(|| OpponentError::Serialization("statistics is not an object".to_string()))?;

        if let Some(missing) = REQUIRED_KEYS.iter().find(|key| !object.contains_key(**key)) {
            return Err(OpponentError::Serialization(format!(
                "statistics missing required key '{}'",
                missing
            )));
        }

        let mut stats: Self = serde_json::from_value(value)?;
        stats.backfill();
        Ok(stats)
    }

    /// Make sure every finger count and declaration can be indexed
    pub fn backfill(&mut self) {
        for fingers in MIN_FINGERS..=MAX_FINGERS {
            self.finger_counts.entry(fingers.to_string()).or_insert(0);
        }
        for choice in Choice::ALL {
            self.choice_history.entry(choice.as_str().to_string()).or_insert(0);
        }
    }

    /// Fold one resolved round into the counters
    pub fn record_round(&mut self, record: &RoundRecord) {
        self.total_rounds += 1;

        if (MIN_FINGERS..=MAX_FINGERS).contains(&record.player_fingers) {
            *self
                .finger_counts
                .entry(record.player_fingers.to_string())
                .or_insert(0) += 1;
        }

        *self
            .choice_history
            .entry(record.player_choice.as_str().to_string())
            .or_insert(0) += 1;

        if record.game_finished {
            self.total_games += 1;
        }

        // running mean over rounds
        let won = if record.player_won_round { 1.0 } else { 0.0 };
        let n = self.total_rounds as f64;
        self.win_rate += (won - self.win_rate) / n;
    }

    pub fn fingers_used(&self, fingers: u8) -> u64 {
        self.finger_counts.get(&fingers.to_string()).copied().unwrap_or(0)
    }

    pub fn choice_used(&self, choice: Choice) -> u64 {
        self.choice_history.get(choice.as_str()).copied().unwrap_or(0)
    }

    /// Sum of the 1..=5 finger usage counters
    pub fn finger_usage_total(&self) -> u64 {
        (MIN_FINGERS..=MAX_FINGERS).map(|f| self.fingers_used(f)).sum()
    }

    /// Most used finger count; the smallest wins ties
    pub fn most_used_fingers(&self) -> Option<u8> {
        let mut best: Option<(u8, u64)> = None;
        for fingers in MIN_FINGERS..=MAX_FINGERS {
            let used = self.fingers_used(fingers);
            if used > 0 && best.map_or(true, |(_, n)| used > n) {
                best = Some((fingers, used));
            }
        }
        best.map(|(fingers, _)| fingers)
    }

    /// Most used declaration; odds wins ties
    pub fn most_used_choice(&self) -> Option<Choice> {
        let odds = self.choice_used(Choice::Odds);
        let evens = self.choice_used(Choice::Evens);
        match (odds, evens) {
            (0, 0) => None,
            (odds, evens) if evens > odds => Some(Choice::Evens),
            _ => Some(Choice::Odds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchState;

    fn round(fingers: u8, choice: Choice, won: bool, finished: bool) -> RoundRecord {
        let mut state = MatchState::default();
        let mut record = state.resolve(fingers, choice, 1, None);
        record.player_won_round = won;
        record.game_finished = finished;
        record
    }

    #[test]
    fn test_default_is_zeroed_with_all_keys() {
        let stats = PlayerStatistics::default();

        assert_eq!(stats.total_games, 0);
        assert_eq!(stats.total_rounds, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.finger_counts.len(), 5);
        assert!(stats.finger_counts.values().all(|n| *n == 0));
        assert_eq!(stats.choice_history.len(), 2);
        assert!(stats.patterns.is_empty());
    }

    #[test]
    fn test_record_round_counts() {
        let mut stats = PlayerStatistics::default();

        stats.record_round(&round(2, Choice::Evens, true, false));
        stats.record_round(&round(2, Choice::Evens, false, false));
        stats.record_round(&round(5, Choice::Odds, true, true));

        assert_eq!(stats.total_rounds, 3);
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.fingers_used(2), 2);
        assert_eq!(stats.fingers_used(5), 1);
        assert_eq!(stats.choice_used(Choice::Evens), 2);
        assert_eq!(stats.choice_used(Choice::Odds), 1);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.finger_usage_total(), 3);
    }

    #[test]
    fn test_out_of_range_fingers_not_counted() {
        let mut stats = PlayerStatistics::default();

        stats.record_round(&round(0, Choice::Odds, false, false));

        assert_eq!(stats.total_rounds, 1);
        assert_eq!(stats.finger_usage_total(), 0);
        assert!(!stats.finger_counts.contains_key("0"));
    }

    #[test]
    fn test_most_used() {
        let mut stats = PlayerStatistics::default();
        assert_eq!(stats.most_used_fingers(), None);
        assert_eq!(stats.most_used_choice(), None);

        stats.record_round(&round(4, Choice::Evens, false, false));
        stats.record_round(&round(1, Choice::Odds, false, false));

        // tie on fingers: smallest, tie on choice: odds
        assert_eq!(stats.most_used_fingers(), Some(1));
        assert_eq!(stats.most_used_choice(), Some(Choice::Odds));

        stats.record_round(&round(4, Choice::Evens, false, false));
        assert_eq!(stats.most_used_fingers(), Some(4));
        assert_eq!(stats.most_used_choice(), Some(Choice::Evens));
    }

    #[test]
    fn test_from_json_accepts_and_backfills() {
        let json = r#"{
            "total_games": 2,
            "total_rounds": 5,
            "finger_counts": {"1": 2, "3": 3},
            "choice_history": {"odds": 4, "evens": 1},
            "win_rate": 0.4
        }"#;

        let stats = PlayerStatistics::from_json(json).unwrap();

        assert_eq!(stats.total_rounds, 5);
        assert_eq!(stats.fingers_used(3), 3);
        assert_eq!(stats.finger_counts.get("2"), Some(&0));
        assert_eq!(stats.finger_counts.get("5"), Some(&0));
        assert!(stats.patterns.is_empty());
    }

    #[test]
    fn test_from_json_rejects_missing_key() {
        let json = r#"{
            "total_games": 2,
            "total_rounds": 5,
            "finger_counts": {"1": 2},
            "choice_history": {"odds": 4, "evens": 1}
        }"#;

        let err = PlayerStatistics::from_json(json).unwrap_err();
        assert!(err.to_string().contains("win_rate"), "{}", err);
    }

    #[test]
    fn test_from_json_rejects_wrong_shapes() {
        assert!(PlayerStatistics::from_json("[1, 2, 3]").is_err());
        assert!(PlayerStatistics::from_json("{not json").is_err());
        assert!(PlayerStatistics::from_json(
            r#"{"total_games": "many", "total_rounds": 1, "finger_counts": {},
                "choice_history": {}, "win_rate": 0.0}"#
        )
        .is_err());
    }

    #[test]
    fn test_patterns_survive_round_trip() {
        let mut stats = PlayerStatistics::default();
        stats
            .patterns
            .insert("streak".to_string(), serde_json::json!({"odds": 3}));

        let json = serde_json::to_string(&stats).unwrap();
        let restored = PlayerStatistics::from_json(&json).unwrap();

        assert_eq!(restored, stats);
    }
}
