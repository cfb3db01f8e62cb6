//! Parity choices and the counter-strategy selector

use log::{debug, warn};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{MAX_FINGERS, MIN_FINGERS};

/// A declaration in odds-or-evens
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Declarer wins when the total is odd.
    Odds,
    /// Declarer wins when the total is even.
    Evens,
}

impl Choice {
    pub const ALL: [Choice; 2] = [Choice::Odds, Choice::Evens];

    /// The other declaration
    pub fn opposite(self) -> Self {
        match self {
            Choice::Odds => Choice::Evens,
            Choice::Evens => Choice::Odds,
        }
    }

    /// Parity the total must have for the declarer to win
    pub fn winning_parity(self) -> Parity {
        match self {
            Choice::Odds => Parity::Odd,
            Choice::Evens => Parity::Even,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Choice::Odds => "odds",
            Choice::Evens => "evens",
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parity of a finger total
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn of(total: u32) -> Self {
        if total % 2 == 1 {
            Parity::Odd
        } else {
            Parity::Even
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Parity::Odd => Parity::Even,
            Parity::Even => Parity::Odd,
        }
    }
}

/// Robot finger counts that defeat the predicted declaration
///
/// The declarer wants `predicted_choice.winning_parity()`, so the robot
/// needs the total to land on the opposite parity.
pub fn counter_moves(predicted_fingers: u8, predicted_choice: Choice) -> Vec<u8> {
    let target = predicted_choice.winning_parity().opposite();

    (MIN_FINGERS..=MAX_FINGERS)
        .filter(|robot| Parity::of(predicted_fingers as u32 + *robot as u32) == target)
        .collect()
}

/// Pick the robot's finger count for this round
///
/// Chooses uniformly among every counter move so the robot never settles
/// into a fixed reply. Falls back to a uniform pick over 1..=5 if no
/// counter move exists.
pub fn select_move<R: Rng + ?Sized>(
    predicted_fingers: u8,
    predicted_choice: Choice,
    rng: &mut R,
) -> u8 {
    let candidates = counter_moves(predicted_fingers, predicted_choice);

    match candidates.choose(rng) {
        Some(fingers) => {
            debug!(
                "counter to {} fingers / {}: candidates {:?}, picked {}",
                predicted_fingers, predicted_choice, candidates, fingers
            );
            *fingers
        }
        None => {
            warn!(
                "no counter move for {} fingers / {}, picking at random",
                predicted_fingers, predicted_choice
            );
            random_fingers(rng)
        }
    }
}

/// Uniform finger count over 1..=5
pub fn random_fingers<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(MIN_FINGERS..=MAX_FINGERS)
}

/// Accept a proposed robot move only if it is a legal finger count
///
/// Anything outside 1..=5 is replaced by a uniform pick.
pub fn validate_move<R: Rng + ?Sized>(candidate: i64, rng: &mut R) -> u8 {
    if (MIN_FINGERS as i64..=MAX_FINGERS as i64).contains(&candidate) {
        candidate as u8
    } else {
        let replacement = random_fingers(rng);
        warn!(
            "{}, substituting {}",
            crate::OpponentError::InvalidMove(candidate),
            replacement
        );
        replacement
    }
}
