//! Watchlist management for the auto-trader.
//!
//! Tracks symbols selected by condition search from inclusion to exit.
//!
//! # Key Components
//!
//! - [`WatchlistStore`]: owns every `WatchEntry` and its transitions
//! - [`PriceEventProcessor`]: per-tick pricing, buy and exit decisions
//! - [`ConditionTable`]: saved and registered condition-search predicates
//! - [`RealtimeRegistry`]: symbols subscribed for realtime ticks
//! - [`AccountSync`]: reconciliation of the watchlist against account snapshots

pub mod account_sync;
pub mod conditions;
pub mod error;
pub mod processor;
pub mod realtime;
pub mod store;

pub use account_sync::{AccountSync, ReconcileOutcome};
pub use conditions::ConditionTable;
pub use error::{WatchlistError, WatchlistResult};
pub use processor::{
    ExitReason, PriceEventProcessor, ProcessorParams, StopLossOrder, TickReport,
    DEFAULT_ROUND_TRIP_COST_PCT,
};
pub use realtime::RealtimeRegistry;
pub use store::WatchlistStore;
