//! Property-based tests for the opponent's guarantees.

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use adaptive_opponent::predictor::{clamp_fingers, choice_from_probability, FrequencyPredictor};
use adaptive_opponent::strategy::validate_move;
use adaptive_opponent::{
    counter_moves, select_move, Choice, MatchState, Parity, PlayerStatistics,
};

fn choice_strategy() -> impl Strategy<Value = Choice> {
    prop_oneof![Just(Choice::Odds), Just(Choice::Evens)]
}

proptest! {
    // 1. Every selected robot move is legal and beats the predicted declaration
    #[test]
    fn robot_move_defeats_prediction(
        fingers in 1..=5u8,
        choice in choice_strategy(),
        seed in any::<u64>(),
    ) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let robot = select_move(fingers, choice, &mut rng);

        prop_assert!((1..=5).contains(&robot));
        let parity = Parity::of(fingers as u32 + robot as u32);
        prop_assert_ne!(parity, choice.winning_parity());
        prop_assert!(counter_moves(fingers, choice).contains(&robot));
    }

    // 2. Raw finger estimates always land on 1..=5
    #[test]
    fn clamped_fingers_in_range(raw in any::<f64>()) {
        let fingers = clamp_fingers(raw);
        prop_assert!((1..=5).contains(&fingers), "raw={raw} fingers={fingers}");
    }

    // 3. Confidence is within [0, 1]
    #[test]
    fn confidence_bounded(p in 0.0..=1.0f64) {
        let (choice, confidence) = choice_from_probability(p);
        prop_assert!((0.0..=1.0).contains(&confidence));
        prop_assert_eq!(choice == Choice::Odds, p > 0.5);
    }

    // 4. Any proposed robot move is corrected onto 1..=5
    #[test]
    fn validated_move_in_range(candidate in any::<i64>(), seed in any::<u64>()) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let fingers = validate_move(candidate, &mut rng);
        prop_assert!((1..=5).contains(&fingers));
        if (1..=5).contains(&candidate) {
            prop_assert_eq!(fingers as i64, candidate);
        }
    }

    // 5. Statistics stay consistent with the rounds fed in
    #[test]
    fn statistics_match_rounds(
        rounds in prop::collection::vec((0..=7u8, choice_strategy(), 1..=5u8), 0..60),
    ) {
        let mut stats = PlayerStatistics::default();
        let mut wins = 0u64;

        for (player, choice, robot) in &rounds {
            let record = MatchState::default().resolve(*player, *choice, *robot, None);
            if record.player_won_round {
                wins += 1;
            }
            stats.record_round(&record);
        }

        let valid = rounds.iter().filter(|(p, _, _)| (1..=5).contains(p)).count() as u64;
        prop_assert_eq!(stats.total_rounds, rounds.len() as u64);
        prop_assert_eq!(stats.finger_usage_total(), valid);
        prop_assert_eq!(
            stats.choice_used(Choice::Odds) + stats.choice_used(Choice::Evens),
            rounds.len() as u64
        );
        if !rounds.is_empty() {
            let expected = wins as f64 / rounds.len() as f64;
            prop_assert!((stats.win_rate - expected).abs() < 1e-9);
        }
    }

    // 6. Frequency predictions are always legal
    #[test]
    fn frequency_prediction_in_range(
        counts in prop::array::uniform5(0..50u64),
        odds in 0..50u64,
        evens in 0..50u64,
    ) {
        let mut stats = PlayerStatistics::default();
        for (i, n) in counts.iter().enumerate() {
            stats.finger_counts.insert((i + 1).to_string(), *n);
        }
        stats.choice_history.insert("odds".to_string(), odds);
        stats.choice_history.insert("evens".to_string(), evens);

        let prediction = FrequencyPredictor::new(0.1).predict_from(&stats);

        prop_assert!((1..=5).contains(&prediction.finger_count));
        if evens <= odds {
            prop_assert_eq!(prediction.choice, Choice::Odds);
        }
    }
}
