//! Unfilled sell-order monitoring.
//!
//! Sell orders that stay (partly) unfilled past the timeout are amended
//! to the symbol's current best bid. Records enter from sell and
//! sell-amend execution notifications and from the periodic unfilled-order
//! query. Once its amendment is queued a record is parked until the order
//! dispatch outcome is known: a dispatched amendment retires it, a failed
//! one puts it back for the next sweep. Parked orders are not revived by
//! the unfilled query. An amended order comes back as a new record through
//! its own accept notification, so amendment repeats until the order fills.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use autotrade_core::{
    resolve_session_time, round_to_tick, AccountNo, OrderId, OrderSink, PendingOrder,
    ReferencePrices, ScreenNumberAllocator, UnfilledOrder, UnfilledRow,
};
use autotrade_telemetry::Metrics;

/// Default age after which an unfilled sell is amended.
pub const DEFAULT_AMEND_AFTER_MS: u64 = 10_000;

/// Tracks unfilled sell orders by broker order id.
#[derive(Debug)]
pub struct UnfilledOrderMonitor {
    orders: BTreeMap<OrderId, UnfilledOrder>,
    /// Orders whose amendment is queued but not yet dispatched.
    amending: BTreeMap<OrderId, UnfilledOrder>,
    amend_after_ms: u64,
}

impl Default for UnfilledOrderMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_AMEND_AFTER_MS)
    }
}

impl UnfilledOrderMonitor {
    #[must_use]
    pub fn new(amend_after_ms: u64) -> Self {
        Self {
            orders: BTreeMap::new(),
            amending: BTreeMap::new(),
            amend_after_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, order_id: &OrderId) -> Option<&UnfilledOrder> {
        self.orders.get(order_id)
    }

    /// Number of orders with an amendment waiting for dispatch.
    pub fn amending_len(&self) -> usize {
        self.amending.len()
    }

    pub fn is_amending(&self, order_id: &OrderId) -> bool {
        self.amending.contains_key(order_id)
    }

    /// Apply a sell / sell-amend notification.
    ///
    /// Returns `true` when the notification resolved a tracked order
    /// (remaining quantity reached zero).
    pub fn on_sell_update(&mut self, order_id: OrderId, update: UnfilledOrder) -> bool {
        if update.remaining_qty.is_zero() {
            let tracked = self.orders.remove(&order_id).is_some();
            let parked = self.amending.remove(&order_id).is_some();
            let resolved = tracked || parked;
            if resolved {
                info!(order_id = %order_id, symbol = %update.symbol, "Unfilled order resolved");
            }
            Metrics::unfilled_orders(self.orders.len());
            return resolved;
        }
        debug!(
            order_id = %order_id,
            symbol = %update.symbol,
            remaining = update.remaining_qty.inner(),
            "Unfilled order tracked"
        );
        if let Some(parked) = self.amending.get_mut(&order_id) {
            *parked = update;
            return false;
        }
        self.orders.insert(order_id, update);
        Metrics::unfilled_orders(self.orders.len());
        false
    }

    /// Merge an unfilled-orders query response.
    ///
    /// Sell rows with a remaining quantity are upserted; an existing record
    /// keeps its accept time. Tracked orders missing from the response are
    /// no longer open at the broker and are dropped. Rows for parked orders
    /// are skipped; a parked order missing from the response is forgotten.
    pub fn reconcile(&mut self, rows: &[UnfilledRow], now_ms: u64, utc_offset_secs: i32) {
        let open_rows: Vec<&UnfilledRow> = rows
            .iter()
            .filter(|row| row.is_sell() && !row.remaining_qty.is_zero())
            .collect();
        self.amending
            .retain(|id, _| open_rows.iter().any(|row| &row.order_id == id));

        let open: BTreeMap<OrderId, UnfilledOrder> = open_rows
            .into_iter()
            .filter(|row| !self.amending.contains_key(&row.order_id))
            .map(|row| {
                let accepted_at = self
                    .orders
                    .get(&row.order_id)
                    .map(|existing| existing.accepted_at)
                    .unwrap_or_else(|| {
                        resolve_session_time(
                            now_ms,
                            row.order_time.as_deref().unwrap_or(""),
                            utc_offset_secs,
                        )
                    });
                (
                    row.order_id.clone(),
                    UnfilledOrder {
                        symbol: row.symbol.clone(),
                        remaining_qty: row.remaining_qty,
                        order_price: row.order_price,
                        accepted_at,
                    },
                )
            })
            .collect();

        let dropped = self
            .orders
            .keys()
            .filter(|id| !open.contains_key(*id))
            .count();
        info!(
            open = open.len(),
            dropped,
            amending = self.amending.len(),
            "Unfilled orders reconciled"
        );
        self.orders = open;
        Metrics::unfilled_orders(self.orders.len());
    }

    /// Queue an amendment for every order at or past the timeout whose
    /// symbol has a best bid. Returns the amended order ids.
    pub fn sweep(
        &mut self,
        now_ms: u64,
        prices: &impl ReferencePrices,
        screens: &mut ScreenNumberAllocator,
        account: &AccountNo,
        sink: &mut impl OrderSink,
    ) -> Vec<OrderId> {
        let due: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|(_, o)| o.age_ms(now_ms) >= self.amend_after_ms)
            .map(|(id, _)| id.clone())
            .collect();

        let mut amended = Vec::new();
        for order_id in due {
            let Some(order) = self.orders.get(&order_id) else {
                continue;
            };
            let Some(bid) = prices.best_bid(&order.symbol) else {
                warn!(order_id = %order_id, symbol = %order.symbol, "Amendment skipped: no best bid cached");
                Metrics::missing_reference_price("amend");
                continue;
            };
            let price = round_to_tick(bid);
            info!(
                order_id = %order_id,
                symbol = %order.symbol,
                remaining = order.remaining_qty.inner(),
                from = %order.order_price,
                to = %price,
                "Amending unfilled sell"
            );
            sink.enqueue_order(PendingOrder::amend_sell(
                screens.next(),
                account.clone(),
                order.symbol.clone(),
                order.remaining_qty,
                price,
                order_id.clone(),
                now_ms,
            ));
            if let Some(order) = self.orders.remove(&order_id) {
                self.amending.insert(order_id.clone(), order);
            }
            Metrics::amendment_issued();
            amended.push(order_id);
        }
        if !amended.is_empty() {
            Metrics::unfilled_orders(self.orders.len());
        }
        amended
    }

    /// The amendment of `original` reached the broker. Returns whether it
    /// was parked.
    pub fn amend_dispatched(&mut self, original: &OrderId) -> bool {
        let retired = self.amending.remove(original).is_some();
        if retired {
            debug!(order_id = %original, "Amended order retired");
        }
        retired
    }

    /// The amendment of `original` failed to dispatch; the order is swept
    /// again with its original accept time.
    pub fn amend_failed(&mut self, original: &OrderId) -> bool {
        let Some(order) = self.amending.remove(original) else {
            return false;
        };
        warn!(order_id = %original, symbol = %order.symbol, "Amendment failed, order re-armed");
        self.orders.insert(original.clone(), order);
        Metrics::unfilled_orders(self.orders.len());
        true
    }
}
