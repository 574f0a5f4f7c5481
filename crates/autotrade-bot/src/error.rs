//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] autotrade_core::CoreError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] autotrade_gateway::GatewayError),

    #[error("Watchlist error: {0}")]
    Watchlist(#[from] autotrade_watchlist::WatchlistError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] autotrade_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] autotrade_telemetry::TelemetryError),

    #[error("No trading account available")]
    NoAccount,
}

pub type AppResult<T> = Result<T, AppError>;
