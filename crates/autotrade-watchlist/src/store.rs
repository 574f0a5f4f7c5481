//! Watchlist entry store.
//!
//! `WatchlistStore` is the only owner of `WatchEntry` records. Every
//! transition goes through one of its methods; callers never hold a
//! mutable entry across calls.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

use autotrade_core::{
    PositionRow, Price, Qty, Symbol, TradingSettings, WatchEntry, WatchState, WatchlistTable,
};

/// Keyed collection of watchlist entries.
#[derive(Debug, Default, Clone)]
pub struct WatchlistStore {
    entries: BTreeMap<Symbol, WatchEntry>,
}

impl WatchlistStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from the persisted table.
    #[must_use]
    pub fn from_table(table: WatchlistTable) -> Self {
        Self {
            entries: table.entries,
        }
    }

    /// Snapshot for persistence.
    pub fn to_table(&self) -> WatchlistTable {
        WatchlistTable {
            entries: self.entries.clone(),
        }
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&WatchEntry> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchEntry> {
        self.entries.values()
    }

    pub fn state(&self, symbol: &Symbol) -> Option<WatchState> {
        self.entries.get(symbol).map(WatchEntry::state)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Start tracking `symbol`. Returns `false` if it is already tracked.
    pub fn include(
        &mut self,
        symbol: Symbol,
        name: impl Into<String>,
        source_condition: Option<String>,
    ) -> bool {
        if self.entries.contains_key(&symbol) {
            return false;
        }
        let entry = WatchEntry::new(symbol.clone(), name, source_condition);
        info!(symbol = %symbol, condition = ?entry.source_condition, "Watchlist entry included");
        self.entries.insert(symbol, entry);
        true
    }

    /// Set target/stop levels from the first tick. Returns `true` only on
    /// the call that priced the entry.
    pub fn price_in(&mut self, symbol: &Symbol, tick: Price, settings: &TradingSettings) -> bool {
        let Some(entry) = self.entries.get_mut(symbol) else {
            return false;
        };
        if entry.priced {
            return false;
        }
        entry.target_price = Some(settings.target_price(tick));
        entry.stop_price = Some(settings.stop_price(tick));
        entry.priced = true;
        debug!(
            symbol = %symbol,
            tick = %tick,
            target = ?entry.target_price,
            stop = ?entry.stop_price,
            "Entry priced in"
        );
        true
    }

    pub fn mark_buy_ordered(&mut self, symbol: &Symbol) {
        if let Some(entry) = self.entries.get_mut(symbol) {
            entry.buy_order_placed = true;
        }
    }

    /// Apply a buy fill. `filled_qty` is the cumulative filled quantity of
    /// the order.
    pub fn record_fill(&mut self, symbol: &Symbol, filled_qty: Qty) -> bool {
        let Some(entry) = self.entries.get_mut(symbol) else {
            return false;
        };
        entry.held_qty = filled_qty;
        entry.buy_order_placed = true;
        info!(symbol = %symbol, held = filled_qty.inner(), "Buy fill recorded");
        true
    }

    /// Update last price and, once the average cost is known, the net
    /// return (`round(pct − round_trip_cost, 2)`).
    pub fn update_quote(&mut self, symbol: &Symbol, last: Price, round_trip_cost_pct: Decimal) {
        let Some(entry) = self.entries.get_mut(symbol) else {
            return;
        };
        entry.last_price = Some(last);
        if let Some(pct) = entry.avg_cost.and_then(|cost| last.pct_from(cost)) {
            entry.return_pct = Some((pct - round_trip_cost_pct).round_dp(2));
        }
    }

    /// Mark the exit requested. Returns `false` if it already was.
    pub fn request_exit(&mut self, symbol: &Symbol) -> bool {
        match self.entries.get_mut(symbol) {
            Some(entry) if !entry.exit_requested => {
                entry.exit_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Re-arm exit evaluation after the exit sell failed to dispatch.
    /// Returns `false` if no exit was pending.
    pub fn cancel_exit(&mut self, symbol: &Symbol) -> bool {
        match self.entries.get_mut(symbol) {
            Some(entry) if entry.exit_requested => {
                entry.exit_requested = false;
                info!(symbol = %symbol, held = entry.held_qty.inner(), "Exit re-armed");
                true
            }
            _ => false,
        }
    }

    /// Merge broker position data into a tracked entry.
    pub fn merge_position(&mut self, row: &PositionRow) -> bool {
        let Some(entry) = self.entries.get_mut(&row.symbol) else {
            return false;
        };
        if !row.name.trim().is_empty() {
            entry.name = row.name.trim().to_string();
        }
        if row.avg_cost.is_positive() {
            entry.avg_cost = Some(row.avg_cost);
        }
        entry.held_qty = row.held_qty;
        true
    }

    pub fn remove(&mut self, symbol: &Symbol) -> Option<WatchEntry> {
        self.entries.remove(symbol)
    }

    /// Keep entries matching `keep`; returns the removed symbols.
    pub fn retain(&mut self, mut keep: impl FnMut(&WatchEntry) -> bool) -> Vec<Symbol> {
        let removed: Vec<Symbol> = self
            .entries
            .values()
            .filter(|e| !keep(*e))
            .map(|e| e.symbol.clone())
            .collect();
        for symbol in &removed {
            self.entries.remove(symbol);
        }
        removed
    }

    /// Drop priced entries without a usable target or stop level.
    pub fn sweep_outliers(&mut self) -> Vec<Symbol> {
        let removed = self.retain(|e| !e.is_outlier());
        for symbol in &removed {
            info!(symbol = %symbol, "Outlier entry removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sym() -> Symbol {
        Symbol::new("005930")
    }

    fn store_with_entry() -> WatchlistStore {
        let mut store = WatchlistStore::new();
        assert!(store.include(sym(), "Samsung", Some("momentum".to_string())));
        store
    }

    #[test]
    fn test_include_is_idempotent() {
        let mut store = store_with_entry();
        assert!(!store.include(sym(), "Other", None));
        assert_eq!(store.get(&sym()).unwrap().name, "Samsung");
    }

    #[test]
    fn test_price_in_once() {
        let mut store = store_with_entry();
        let settings = TradingSettings::default();
        assert!(store.price_in(&sym(), Price::from_units(10_000), &settings));
        assert!(!store.price_in(&sym(), Price::from_units(20_000), &settings));

        let entry = store.get(&sym()).unwrap();
        assert_eq!(entry.target_price, Some(Price::new(dec!(10250))));
        assert_eq!(entry.stop_price, Some(Price::new(dec!(9750))));
        assert_eq!(entry.state(), WatchState::PricedIn);
    }

    #[test]
    fn test_return_pct_net_of_cost() {
        let mut store = store_with_entry();
        store.merge_position(&PositionRow {
            symbol: sym(),
            name: String::new(),
            tradable_qty: Qty(10),
            held_qty: Qty(10),
            avg_cost: Price::from_units(10_000),
            last_price: Price::from_units(10_000),
            return_pct: Decimal::ZERO,
        });
        store.update_quote(&sym(), Price::from_units(10_300), dec!(0.21));
        let entry = store.get(&sym()).unwrap();
        assert_eq!(entry.return_pct, Some(dec!(2.79)));
        assert_eq!(entry.name, "Samsung");
        assert_eq!(entry.state(), WatchState::Holding);
    }

    #[test]
    fn test_return_pct_absent_without_cost() {
        let mut store = store_with_entry();
        store.update_quote(&sym(), Price::from_units(10_300), dec!(0.21));
        let entry = store.get(&sym()).unwrap();
        assert_eq!(entry.last_price, Some(Price::from_units(10_300)));
        assert_eq!(entry.return_pct, None);
    }

    #[test]
    fn test_request_exit_once() {
        let mut store = store_with_entry();
        assert!(store.request_exit(&sym()));
        assert!(!store.request_exit(&sym()));
        assert!(!store.request_exit(&Symbol::new("000660")));
    }

    #[test]
    fn test_cancel_exit_allows_new_request() {
        let mut store = store_with_entry();
        assert!(!store.cancel_exit(&sym()));
        store.request_exit(&sym());
        assert!(store.cancel_exit(&sym()));
        assert!(!store.get(&sym()).unwrap().exit_requested);
        assert!(store.request_exit(&sym()));
    }

    #[test]
    fn test_sweep_outliers() {
        let mut store = store_with_entry();
        store.include(Symbol::new("000660"), "Hynix", None);
        store.price_in(&sym(), Price::from_units(10_000), &TradingSettings::default());

        let mut table = store.to_table();
        table
            .entries
            .get_mut(&Symbol::new("000660"))
            .unwrap()
            .priced = true;
        let mut store = WatchlistStore::from_table(table);

        assert_eq!(store.sweep_outliers(), vec![Symbol::new("000660")]);
        assert!(store.contains(&sym()));
        assert!(store.sweep_outliers().is_empty());
    }

    #[test]
    fn test_record_fill_sets_cumulative_qty() {
        let mut store = store_with_entry();
        store.mark_buy_ordered(&sym());
        assert!(store.record_fill(&sym(), Qty(4)));
        assert!(store.record_fill(&sym(), Qty(11)));
        assert_eq!(store.get(&sym()).unwrap().held_qty, Qty(11));
        assert!(!store.record_fill(&Symbol::new("000660"), Qty(1)));
    }
}
