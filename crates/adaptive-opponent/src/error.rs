//! Error types for the adaptive opponent

use thiserror::Error;

/// Errors raised inside the opponent core
///
/// None of these are meant to reach the player: the [`Opponent`](crate::Opponent)
/// facade turns every one of them into a safe default plus a log record.
#[derive(Error, Debug)]
pub enum OpponentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Model encode error: {0}")]
    ModelEncode(String),

    #[error("Model decode error: {0}")]
    ModelDecode(String),

    #[error("Incompatible model state: found version {found}, expected {expected}")]
    IncompatibleModel { found: u32, expected: u32 },

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Learning error: {0}")]
    Learning(String),

    #[error("Invalid move: {0} is outside 1..=5")]
    InvalidMove(i64),
}

/// Result type alias for the adaptive opponent
pub type Result<T> = std::result::Result<T, OpponentError>;

impl From<serde_json::Error> for OpponentError {
    fn from(err: serde_json::Error) -> Self {
        OpponentError::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for OpponentError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        OpponentError::ModelEncode(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for OpponentError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        OpponentError::ModelDecode(err.to_string())
    }
}
