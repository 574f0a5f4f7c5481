//! Core domain types for the condition-search auto-trader.
//!
//! This crate provides the data model shared by every other crate:
//! - `Price`, `Qty`: precision-safe numeric types
//! - `Symbol`, `OrderId`, `AccountNo`, `ConditionIndex`: identifiers
//! - `WatchEntry`: per-symbol watchlist record and its lifecycle state
//! - `PendingOrder`, `UnfilledOrder`, `AccountSnapshot`: order and account records
//! - `round_to_tick`: exchange tick-size rounding
//! - `ScreenNumberAllocator`: cyclic subscription-channel ids

pub mod account;
pub mod decimal;
pub mod error;
pub mod ids;
pub mod order;
pub mod screen;
pub mod settings;
pub mod tick;
pub mod time;
pub mod watch;

pub use account::{AccountSnapshot, PositionRow, SymbolLimits, UnfilledOrder, UnfilledRow};
pub use decimal::{Price, Qty};
pub use error::{CoreError, Result};
pub use ids::{AccountNo, ConditionIndex, OrderId, Symbol};
pub use order::{OrderAck, OrderKind, OrderSink, PendingOrder, PriceType, ReferencePrices};
pub use screen::{ScreenId, ScreenNumberAllocator};
pub use settings::TradingSettings;
pub use tick::{round_to_tick, tick_size};
pub use time::resolve_session_time;
pub use watch::{WatchEntry, WatchState, WatchlistTable};
