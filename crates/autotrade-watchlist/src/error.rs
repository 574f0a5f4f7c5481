//! Watchlist error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Condition not registered: {0}")]
    NotRegistered(String),
}

pub type WatchlistResult<T> = Result<T, WatchlistError>;
