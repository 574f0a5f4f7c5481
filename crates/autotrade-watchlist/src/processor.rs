//! Per-tick watchlist decisions.
//!
//! For every trade tick, in order:
//! 1. cache the best bid as the symbol's sell reference price
//! 2. price a newly included entry and, if affordable, enqueue its buy
//! 3. update last price and net return
//! 4. for held entries without a pending exit, check stop-loss first and
//!    take-profit second; on a trigger enqueue exactly one sell and
//!    deregister the symbol from the condition table
//!
//! Nothing here retries: a skipped decision is re-evaluated on the next
//! tick from the entry's persistent state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use autotrade_core::{
    round_to_tick, AccountNo, OrderSink, PendingOrder, Price, Qty, ReferencePrices,
    ScreenNumberAllocator, Symbol, TradingSettings,
};
use autotrade_gateway::Tick;
use autotrade_telemetry::Metrics;

use crate::conditions::ConditionTable;
use crate::store::WatchlistStore;

/// Default round-trip cost (fees and tax) in percentage points.
pub const DEFAULT_ROUND_TRIP_COST_PCT: Decimal = Decimal::from_parts(21, 0, 0, false, 2);

/// How stop-loss sells are priced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopLossOrder {
    /// Limit sell at the cached best bid.
    #[default]
    BestBidLimit,
    /// Market sell.
    Market,
}

/// Why an exit was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
        }
    }
}

/// Processor parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorParams {
    pub account: AccountNo,
    pub stop_loss_order: StopLossOrder,
    pub round_trip_cost_pct: Decimal,
}

impl Default for ProcessorParams {
    fn default() -> Self {
        Self {
            account: AccountNo::default(),
            stop_loss_order: StopLossOrder::default(),
            round_trip_cost_pct: DEFAULT_ROUND_TRIP_COST_PCT,
        }
    }
}

/// What a tick caused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entry was priced in by this tick.
    pub priced: bool,
    /// Quantity of the market buy enqueued by this tick.
    pub bought: Option<Qty>,
    /// Exit sell enqueued by this tick.
    pub exit: Option<ExitReason>,
}

/// Tick-driven decision logic. Owns the best-bid reference cache.
#[derive(Debug, Default)]
pub struct PriceEventProcessor {
    params: ProcessorParams,
    best_bids: HashMap<Symbol, Price>,
}

impl PriceEventProcessor {
    #[must_use]
    pub fn new(params: ProcessorParams) -> Self {
        Self {
            params,
            best_bids: HashMap::new(),
        }
    }

    pub fn params(&self) -> &ProcessorParams {
        &self.params
    }

    pub fn set_account(&mut self, account: AccountNo) {
        self.params.account = account;
    }

    /// Process one trade tick.
    #[allow(clippy::too_many_arguments)]
    pub fn on_tick(
        &mut self,
        tick: &Tick,
        now_ms: u64,
        settings: &TradingSettings,
        store: &mut WatchlistStore,
        conditions: &mut ConditionTable,
        screens: &mut ScreenNumberAllocator,
        sink: &mut impl OrderSink,
    ) -> TickReport {
        let mut report = TickReport::default();
        let symbol = &tick.symbol;

        // 1. reference price
        if tick.best_bid.is_positive() {
            self.best_bids.insert(symbol.clone(), tick.best_bid);
        }

        let last = tick.last_price;
        if !last.is_positive() {
            debug!(symbol = %symbol, "Tick without a last price ignored");
            return report;
        }
        let Some(entry) = store.get(symbol) else {
            return report;
        };

        // 2. pricing and buy
        if !entry.priced {
            report.priced = store.price_in(symbol, last, settings);
        }
        let awaiting_buy = store
            .get(symbol)
            .is_some_and(|e| !e.buy_order_placed && !e.is_holding() && !e.exit_requested);
        if awaiting_buy {
            let qty = settings.buy_qty(last);
            if qty.is_zero() {
                debug!(symbol = %symbol, tick = %last, budget = %settings.buy_amount, "Buy quantity below one share");
            } else {
                sink.enqueue_order(PendingOrder::market_buy(
                    screens.next(),
                    self.params.account.clone(),
                    symbol.clone(),
                    qty,
                    now_ms,
                ));
                store.mark_buy_ordered(symbol);
                info!(symbol = %symbol, qty = qty.inner(), tick = %last, "Market buy enqueued");
                report.bought = Some(qty);
            }
        }

        // 3. quote
        store.update_quote(symbol, last, self.params.round_trip_cost_pct);

        // 4. exits
        report.exit = self.evaluate_exit(symbol, last, now_ms, store, conditions, screens, sink);
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_exit(
        &self,
        symbol: &Symbol,
        last: Price,
        now_ms: u64,
        store: &mut WatchlistStore,
        conditions: &mut ConditionTable,
        screens: &mut ScreenNumberAllocator,
        sink: &mut impl OrderSink,
    ) -> Option<ExitReason> {
        let entry = store.get(symbol)?;
        if !entry.is_holding() || entry.exit_requested {
            return None;
        }
        let held = entry.held_qty;
        let stop_hit = entry.stop_price.is_some_and(|stop| last < stop);
        let target_hit = entry.target_price.is_some_and(|target| last > target);

        let (reason, order) = if stop_hit {
            let order = match self.params.stop_loss_order {
                StopLossOrder::BestBidLimit => {
                    let Some(bid) = self.best_bid(symbol) else {
                        warn!(symbol = %symbol, tick = %last, "Stop-loss skipped: no best bid cached");
                        Metrics::missing_reference_price("stop_loss");
                        return None;
                    };
                    PendingOrder::limit_sell(
                        screens.next(),
                        self.params.account.clone(),
                        symbol.clone(),
                        held,
                        round_to_tick(bid),
                        now_ms,
                    )
                }
                StopLossOrder::Market => PendingOrder::market_sell(
                    screens.next(),
                    self.params.account.clone(),
                    symbol.clone(),
                    held,
                    now_ms,
                ),
            };
            (ExitReason::StopLoss, order)
        } else if target_hit {
            let order = PendingOrder::limit_sell(
                screens.next(),
                self.params.account.clone(),
                symbol.clone(),
                held,
                round_to_tick(last),
                now_ms,
            );
            (ExitReason::TakeProfit, order)
        } else {
            return None;
        };

        info!(
            symbol = %symbol,
            reason = reason.as_str(),
            qty = held.inner(),
            price = ?order.price,
            tick = %last,
            "Exit sell enqueued"
        );
        sink.enqueue_order(order);
        store.request_exit(symbol);
        conditions.deregister_symbol(symbol);
        Metrics::exit_requested(reason.as_str());
        Some(reason)
    }
}

impl ReferencePrices for PriceEventProcessor {
    fn best_bid(&self, symbol: &Symbol) -> Option<Price> {
        self.best_bids.get(symbol).copied()
    }
}
