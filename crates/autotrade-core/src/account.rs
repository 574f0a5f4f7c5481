//! Account and order-book records reported by the broker.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Qty};
use crate::ids::{OrderId, Symbol};

/// One held position in an account snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRow {
    pub symbol: Symbol,
    pub name: String,
    /// Quantity that can be sold right now.
    pub tradable_qty: Qty,
    pub held_qty: Qty,
    pub avg_cost: Price,
    pub last_price: Price,
    /// Broker-reported return in percent.
    pub return_pct: Decimal,
}

impl PositionRow {
    /// Market value at the last price.
    pub fn market_value(&self) -> Decimal {
        self.held_qty.notional(self.last_price)
    }
}

/// Authoritative account state. Always replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub estimated_assets: Decimal,
    pub positions: Vec<PositionRow>,
}

impl AccountSnapshot {
    pub fn position(&self, symbol: &Symbol) -> Option<&PositionRow> {
        self.positions.iter().find(|p| &p.symbol == symbol)
    }

    pub fn holds(&self, symbol: &Symbol) -> bool {
        self.position(symbol).is_some()
    }

    /// Estimated assets not tied up in held positions.
    ///
    /// Never negative.
    pub fn available_cash(&self) -> Decimal {
        let held: Decimal = self.positions.iter().map(PositionRow::market_value).sum();
        (self.estimated_assets - held).max(Decimal::ZERO)
    }
}

/// One row of the unfilled-orders query response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilledRow {
    pub order_id: OrderId,
    pub symbol: Symbol,
    /// Broker side label (e.g. "+매수", "-매도").
    pub side: String,
    pub remaining_qty: Qty,
    pub order_price: Price,
    /// Broker accept time as HHMMSS, if reported.
    pub order_time: Option<String>,
}

impl UnfilledRow {
    pub fn is_sell(&self) -> bool {
        self.side.contains("매도") || self.side.eq_ignore_ascii_case("sell")
    }
}

/// Accepted sell order that is not completely filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnfilledOrder {
    pub symbol: Symbol,
    pub remaining_qty: Qty,
    pub order_price: Price,
    /// Broker accept time (Unix milliseconds).
    pub accepted_at: u64,
}

impl UnfilledOrder {
    /// Milliseconds since acceptance. Zero if `accepted_at` is in the future.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.accepted_at)
    }
}

/// Daily price limits for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolLimits {
    pub upper: Price,
    pub lower: Price,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn row(symbol: &str, held: u64, last: i64) -> PositionRow {
        PositionRow {
            symbol: Symbol::new(symbol),
            name: symbol.to_string(),
            tradable_qty: Qty(held),
            held_qty: Qty(held),
            avg_cost: Price::from_units(last),
            last_price: Price::from_units(last),
            return_pct: Decimal::ZERO,
        }
    }

    #[test]
    fn test_available_cash() {
        let snapshot = AccountSnapshot {
            estimated_assets: dec!(1000000),
            positions: vec![row("005930", 10, 70_000), row("000660", 1, 100_000)],
        };
        assert_eq!(snapshot.available_cash(), dec!(200000));
        assert!(snapshot.holds(&Symbol::new("000660")));
        assert!(!snapshot.holds(&Symbol::new("035720")));
    }

    #[test]
    fn test_available_cash_never_negative() {
        let snapshot = AccountSnapshot {
            estimated_assets: dec!(1000),
            positions: vec![row("005930", 10, 70_000)],
        };
        assert_eq!(snapshot.available_cash(), Decimal::ZERO);
    }

    #[test]
    fn test_unfilled_age_saturates() {
        let order = UnfilledOrder {
            symbol: Symbol::new("005930"),
            remaining_qty: Qty(1),
            order_price: Price::from_units(70_000),
            accepted_at: 5_000,
        };
        assert_eq!(order.age_ms(16_000), 11_000);
        assert_eq!(order.age_ms(1_000), 0);
    }

    #[test]
    fn test_unfilled_row_side() {
        let mut r = UnfilledRow {
            order_id: OrderId::new("1"),
            symbol: Symbol::new("005930"),
            side: "-매도".to_string(),
            remaining_qty: Qty(1),
            order_price: Price::from_units(1_000),
            order_time: None,
        };
        assert!(r.is_sell());
        r.side = "+매수".to_string();
        assert!(!r.is_sell());
    }
}
