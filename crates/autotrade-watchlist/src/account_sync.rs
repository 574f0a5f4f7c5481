//! Reconciliation of the watchlist against broker account snapshots.
//!
//! The snapshot is authoritative and replaced wholesale each time. The
//! first reconciliation of a session subscribes every held symbol to
//! realtime ticks and drops every entry the account does not hold. Later
//! reconciliations only drop entries that were held (or exiting) and have
//! disappeared from the account, leaving freshly included and buy-pending
//! entries alone.

use tracing::info;

use autotrade_core::{AccountSnapshot, Symbol};
use autotrade_telemetry::Metrics;

use crate::store::WatchlistStore;

/// Result of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Held symbols to register for realtime ticks (first run only).
    pub auto_register: Vec<Symbol>,
    /// Entries removed from the watchlist.
    pub dropped: Vec<Symbol>,
}

/// Holds the latest snapshot and the first-run flag.
#[derive(Debug, Default)]
pub struct AccountSync {
    snapshot: Option<AccountSnapshot>,
    first_done: bool,
}

impl AccountSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<&AccountSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_first_done(&self) -> bool {
        self.first_done
    }

    /// Replace the snapshot and reconcile `store` against it.
    pub fn reconcile(
        &mut self,
        snapshot: AccountSnapshot,
        store: &mut WatchlistStore,
    ) -> ReconcileOutcome {
        let first = !self.first_done;

        for row in &snapshot.positions {
            store.merge_position(row);
        }

        let dropped = if first {
            store.retain(|e| snapshot.holds(&e.symbol))
        } else {
            store.retain(|e| snapshot.holds(&e.symbol) || !(e.is_holding() || e.exit_requested))
        };

        let auto_register = if first {
            snapshot.positions.iter().map(|r| r.symbol.clone()).collect()
        } else {
            Vec::new()
        };

        info!(
            first,
            positions = snapshot.positions.len(),
            dropped = dropped.len(),
            auto_register = auto_register.len(),
            available_cash = %snapshot.available_cash(),
            "Account reconciled"
        );
        Metrics::reconciled();
        if !dropped.is_empty() {
            Metrics::watchlist_removed("not_held", dropped.len());
        }

        self.snapshot = Some(snapshot);
        self.first_done = true;
        ReconcileOutcome {
            auto_register,
            dropped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autotrade_core::{PositionRow, Price, Qty, WatchState};
    use rust_decimal::Decimal;

    fn row(symbol: &str, held: u64) -> PositionRow {
        PositionRow {
            symbol: Symbol::new(symbol),
            name: format!("name-{symbol}"),
            tradable_qty: Qty(held),
            held_qty: Qty(held),
            avg_cost: Price::from_units(10_000),
            last_price: Price::from_units(10_000),
            return_pct: Decimal::ZERO,
        }
    }

    fn snapshot(rows: Vec<PositionRow>) -> AccountSnapshot {
        AccountSnapshot {
            estimated_assets: Decimal::from(1_000_000),
            positions: rows,
        }
    }

    #[test]
    fn test_first_reconciliation_registers_and_drops() {
        let mut sync = AccountSync::new();
        let mut store = WatchlistStore::new();
        store.include(Symbol::new("035720"), "stale", None);
        store.include(Symbol::new("005930"), "Samsung", None);

        let outcome = sync.reconcile(snapshot(vec![row("005930", 3), row("000660", 5)]), &mut store);

        assert_eq!(outcome.dropped, vec![Symbol::new("035720")]);
        assert_eq!(
            outcome.auto_register,
            vec![Symbol::new("005930"), Symbol::new("000660")]
        );
        assert_eq!(store.len(), 1);
        assert!(!store.contains(&Symbol::new("000660")));
        let merged = store.get(&Symbol::new("005930")).unwrap();
        assert_eq!(merged.held_qty, Qty(3));
        assert_eq!(merged.avg_cost, Some(Price::from_units(10_000)));
        assert_eq!(merged.state(), WatchState::Holding);
        assert_eq!(merged.name, "name-005930");
        assert!(sync.is_first_done());
    }

    #[test]
    fn test_second_reconciliation_registers_nothing() {
        let mut sync = AccountSync::new();
        let mut store = WatchlistStore::new();
        sync.reconcile(snapshot(vec![row("005930", 3)]), &mut store);

        let outcome = sync.reconcile(snapshot(vec![row("005930", 3), row("000660", 5)]), &mut store);
        assert!(outcome.auto_register.is_empty());
        assert!(!store.contains(&Symbol::new("000660")));
    }

    #[test]
    fn test_later_reconciliation_drops_only_sold_entries() {
        let mut sync = AccountSync::new();
        let mut store = WatchlistStore::new();
        store.include(Symbol::new("005930"), "Samsung", None);
        sync.reconcile(snapshot(vec![row("005930", 3)]), &mut store);

        // newly included, not yet bought: kept
        store.include(Symbol::new("000660"), "Hynix", None);
        store.mark_buy_ordered(&Symbol::new("000660"));

        let outcome = sync.reconcile(snapshot(vec![]), &mut store);
        assert_eq!(outcome.dropped, vec![Symbol::new("005930")]);
        assert!(store.contains(&Symbol::new("000660")));
        assert_eq!(sync.snapshot().unwrap().positions.len(), 0);
    }
}
