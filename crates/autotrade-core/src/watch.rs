//! Watchlist entry model.
//!
//! A `WatchEntry` tracks one symbol from condition-search inclusion
//! through pricing, buying, holding and exit. The lifecycle state is
//! derived from the entry's fields rather than stored, so a persisted
//! table always restores into a consistent state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decimal::{Price, Qty};
use crate::ids::Symbol;

/// Lifecycle state of a watchlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchState {
    /// Tracked, no tick seen yet.
    Included,
    /// Target and stop levels set.
    PricedIn,
    /// Market buy enqueued, no fill yet.
    BuyOrdered,
    /// Shares held.
    Holding,
    /// Exit sell enqueued.
    ExitRequested,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Included => "included",
            Self::PricedIn => "priced_in",
            Self::BuyOrdered => "buy_ordered",
            Self::Holding => "holding",
            Self::ExitRequested => "exit_requested",
        };
        f.write_str(s)
    }
}

/// Per-symbol watchlist record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub symbol: Symbol,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub last_price: Option<Price>,
    #[serde(default)]
    pub avg_cost: Option<Price>,
    #[serde(default)]
    pub target_price: Option<Price>,
    #[serde(default)]
    pub stop_price: Option<Price>,
    #[serde(default)]
    pub return_pct: Option<Decimal>,
    /// Name of the condition that included this symbol.
    #[serde(default)]
    pub source_condition: Option<String>,
    #[serde(default)]
    pub held_qty: Qty,
    #[serde(default)]
    pub buy_order_placed: bool,
    /// Levels were set by the first tick.
    #[serde(default)]
    pub priced: bool,
    #[serde(default)]
    pub exit_requested: bool,
}

impl WatchEntry {
    #[must_use]
    pub fn new(symbol: Symbol, name: impl Into<String>, source_condition: Option<String>) -> Self {
        Self {
            symbol,
            name: name.into(),
            last_price: None,
            avg_cost: None,
            target_price: None,
            stop_price: None,
            return_pct: None,
            source_condition,
            held_qty: Qty::ZERO,
            buy_order_placed: false,
            priced: false,
            exit_requested: false,
        }
    }

    pub fn state(&self) -> WatchState {
        if self.exit_requested {
            WatchState::ExitRequested
        } else if !self.held_qty.is_zero() {
            WatchState::Holding
        } else if self.buy_order_placed {
            WatchState::BuyOrdered
        } else if self.priced {
            WatchState::PricedIn
        } else {
            WatchState::Included
        }
    }

    pub fn is_holding(&self) -> bool {
        !self.held_qty.is_zero()
    }

    /// Entry was priced but lacks a usable target or stop level.
    pub fn is_outlier(&self) -> bool {
        self.priced && (self.target_price.is_none() || self.stop_price.is_none())
    }
}

/// Persisted form of the watchlist, keyed by symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistTable {
    pub entries: BTreeMap<Symbol, WatchEntry>,
}

impl WatchlistTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
