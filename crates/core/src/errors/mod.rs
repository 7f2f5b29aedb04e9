//! Error types and Result alias for the achievements engine

use thiserror::Error;

/// Main error type for the achievements engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid activity type: {0}")]
    InvalidActivity(String),

    #[error("Achievement level not reached: {0}")]
    NotEligible(String),

    #[error("No unclaimed rewards for achievement: {0}")]
    NothingToClaim(String),

    #[error("Exchange item not available: {0}")]
    ItemUnavailable(String),

    #[error("XP cost mismatch: request says {expected}, catalog says {actual}")]
    PriceMismatch { expected: i64, actual: i64 },

    #[error("Insufficient XP: required {required}, available {available}")]
    InsufficientXp { required: i64, available: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
