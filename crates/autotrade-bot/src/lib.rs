//! Condition-search intraday auto-trader.
//!
//! Wires the components into one engine:
//! - condition matches feed the watchlist
//! - ticks price entries, buy, and trigger exits
//! - orders and queries leave through rate-gated queues
//! - unfilled sells are amended to the best bid after a timeout
//! - the account snapshot is reconciled into the watchlist periodically

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod tasks;

pub use app::Application;
pub use config::AppConfig;
pub use engine::Engine;
pub use error::{AppError, AppResult};
pub use tasks::{PeriodicTasks, TaskKind};
